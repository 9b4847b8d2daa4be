//! Expiry notification rules

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// A received stock line that reaches its warning day
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExpiryWarning {
    pub stock_in_item_id: i64,
    pub product_name: String,
    pub warehouse_name: String,
    pub expire_date: NaiveDate,
    pub days_left: i64,
    pub measurement_count: i32,
}

impl ExpiryWarning {
    /// Human-readable notification text
    pub fn message(&self) -> String {
        format!(
            "Product expire warning\n\nProduct: {}\nWarehouse: {}\nQuantity: {}\nExpire date: {}\nDays left: {}",
            self.product_name,
            self.warehouse_name,
            self.measurement_count,
            self.expire_date,
            self.days_left
        )
    }
}

/// Whole days from `today` until `expire_date` (negative once expired)
pub fn days_until(today: NaiveDate, expire_date: NaiveDate) -> i64 {
    (expire_date - today).num_days()
}

/// A line is announced exactly once, on the day its remaining days equal the warning offset
pub fn should_notify(today: NaiveDate, expire_date: NaiveDate, notify_before_day: i32) -> bool {
    notify_before_day >= 0 && days_until(today, expire_date) == i64::from(notify_before_day)
}

/// Next daily run at `hour:minute` UTC strictly after `now`.
///
/// Out-of-range hour or minute values fall back to midnight.
pub fn next_run_after(now: DateTime<Utc>, hour: u32, minute: u32) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
    let today_run = now.date_naive().and_time(time).and_utc();
    if today_run > now {
        today_run
    } else {
        today_run + Duration::days(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_days_until() {
        assert_eq!(days_until(date(2024, 2, 27), date(2024, 3, 1)), 3);
        assert_eq!(days_until(date(2024, 3, 1), date(2024, 3, 1)), 0);
        assert_eq!(days_until(date(2024, 3, 2), date(2024, 3, 1)), -1);
    }

    #[test]
    fn test_should_notify_only_on_warning_day() {
        let expire = date(2024, 5, 10);
        assert!(should_notify(date(2024, 5, 7), expire, 3));
        assert!(!should_notify(date(2024, 5, 6), expire, 3));
        assert!(!should_notify(date(2024, 5, 8), expire, 3));
        assert!(should_notify(date(2024, 5, 10), expire, 0));
        assert!(!should_notify(date(2024, 5, 11), expire, -1));
    }

    #[test]
    fn test_next_run_later_today() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 6, 30, 0).unwrap();
        let next = next_run_after(now, 9, 0);
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_next_run_tomorrow_when_time_passed() {
        let now = Utc.with_ymd_and_hms(2024, 12, 31, 9, 0, 0).unwrap();
        let next = next_run_after(now, 9, 0);
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_message_contains_product_and_days() {
        let warning = ExpiryWarning {
            stock_in_item_id: 1,
            product_name: "Milk".to_string(),
            warehouse_name: "Main".to_string(),
            expire_date: date(2024, 5, 10),
            days_left: 3,
            measurement_count: 12,
        };
        let message = warning.message();
        assert!(message.contains("Product: Milk"));
        assert!(message.contains("Expire date: 2024-05-10"));
        assert!(message.contains("Days left: 3"));
    }
}
