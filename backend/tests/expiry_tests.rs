//! Expiry notification tests
//!
//! Covers the daily expiry check rules:
//! - a received line is announced only on the day its remaining days equal the warning offset
//! - the daily job always schedules its next run within the coming 24 hours

use chrono::{Days, NaiveDate, TimeZone, Timelike, Utc};
use proptest::prelude::*;
use shared::{days_until, next_run_after, should_notify, ExpiryWarning};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_notify_across_month_boundary() {
        assert!(should_notify(date(2024, 1, 30), date(2024, 2, 2), 3));
    }

    #[test]
    fn test_notify_across_leap_day() {
        assert_eq!(days_until(date(2024, 2, 28), date(2024, 3, 1)), 2);
        assert_eq!(days_until(date(2023, 2, 28), date(2023, 3, 1)), 1);
    }

    #[test]
    fn test_expired_lines_are_not_announced() {
        assert!(!should_notify(date(2024, 6, 2), date(2024, 6, 1), 0));
        assert!(!should_notify(date(2024, 6, 2), date(2024, 6, 1), 1));
    }

    #[test]
    fn test_next_run_invalid_time_falls_back_to_midnight() {
        let now = Utc.with_ymd_and_hms(2024, 4, 10, 12, 0, 0).unwrap();
        let next = next_run_after(now, 25, 0);
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 4, 11, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_warning_serializes_for_webhook() {
        let warning = ExpiryWarning {
            stock_in_item_id: 42,
            product_name: "Yogurt".to_string(),
            warehouse_name: "North".to_string(),
            expire_date: date(2024, 7, 1),
            days_left: 2,
            measurement_count: 30,
        };
        let json = serde_json::to_value(&warning).unwrap();
        assert_eq!(json["stock_in_item_id"], 42);
        assert_eq!(json["expire_date"], "2024-07-01");
        assert!(warning.message().contains("Warehouse: North"));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn day_strategy() -> impl Strategy<Value = NaiveDate> {
        (0u64..3650).prop_map(|offset| date(2020, 1, 1).checked_add_days(Days::new(offset)).unwrap())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Exactly one day in the window triggers the warning
        #[test]
        fn prop_notify_exactly_on_warning_day(
            today in day_strategy(),
            notify_before in 0i32..90,
            shift in 1u64..30,
        ) {
            let expire = today.checked_add_days(Days::new(notify_before as u64)).unwrap();
            prop_assert!(should_notify(today, expire, notify_before));

            let later = expire.checked_add_days(Days::new(shift)).unwrap();
            prop_assert!(!should_notify(today, later, notify_before));

            let earlier = today.checked_add_days(Days::new(shift)).unwrap();
            prop_assert!(!should_notify(earlier, expire, notify_before));
        }

        /// The next run is in the future, at most one day away, at the configured time
        #[test]
        fn prop_next_run_within_a_day(
            secs in 1_600_000_000i64..1_900_000_000,
            hour in 0u32..24,
            minute in 0u32..60,
        ) {
            let now = Utc.timestamp_opt(secs, 0).unwrap();
            let next = next_run_after(now, hour, minute);
            prop_assert!(next > now);
            prop_assert!(next - now <= chrono::Duration::days(1));
            prop_assert_eq!(next.hour(), hour);
            prop_assert_eq!(next.minute(), minute);
            prop_assert_eq!(next.second(), 0);
        }
    }
}
