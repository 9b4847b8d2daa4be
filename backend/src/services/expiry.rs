//! Daily expiry check
//!
//! Once a day the job looks at received lines that carry an expire date and
//! announces each one on the day its remaining days equal `notify_before_day`.

use std::time::Duration;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use shared::{days_until, next_run_after, should_notify, ExpiryWarning};
use sqlx::{FromRow, PgPool};
use tokio::task::JoinHandle;

use crate::config::ExpiryConfig;
use crate::error::{AppError, AppResult};

/// Where expiry warnings are delivered
#[derive(Clone)]
pub enum ExpiryNotifier {
    /// Structured log line only
    Log,
    /// JSON POST to an HTTP endpoint
    Webhook { client: reqwest::Client, url: String },
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    text: String,
    warning: &'a ExpiryWarning,
}

impl ExpiryNotifier {
    pub fn from_config(config: &ExpiryConfig) -> Self {
        match &config.webhook_url {
            Some(url) if !url.trim().is_empty() => ExpiryNotifier::Webhook {
                client: reqwest::Client::new(),
                url: url.clone(),
            },
            _ => ExpiryNotifier::Log,
        }
    }

    pub async fn notify(&self, warning: &ExpiryWarning) -> AppResult<()> {
        tracing::info!(
            stock_in_item_id = warning.stock_in_item_id,
            product = %warning.product_name,
            warehouse = %warning.warehouse_name,
            expire_date = %warning.expire_date,
            days_left = warning.days_left,
            "Product expire warning"
        );

        match self {
            ExpiryNotifier::Log => Ok(()),
            ExpiryNotifier::Webhook { client, url } => {
                let response = client
                    .post(url)
                    .json(&WebhookPayload {
                        text: warning.message(),
                        warning,
                    })
                    .send()
                    .await
                    .map_err(|e| AppError::ExternalService(format!("expiry webhook: {}", e)))?;

                if !response.status().is_success() {
                    return Err(AppError::ExternalService(format!(
                        "expiry webhook returned {}",
                        response.status()
                    )));
                }
                Ok(())
            }
        }
    }
}

/// Received line that has an expire date
#[derive(Debug, Clone, FromRow)]
pub struct ExpiringLine {
    pub stock_in_item_id: i64,
    pub product_name: String,
    pub warehouse_name: String,
    pub expire_date: NaiveDate,
    pub notify_before_day: i32,
    pub measurement_count: i32,
}

/// Lines due for a warning on `today`
pub fn warnings_for(today: NaiveDate, lines: Vec<ExpiringLine>) -> Vec<ExpiryWarning> {
    lines
        .into_iter()
        .filter(|l| should_notify(today, l.expire_date, l.notify_before_day))
        .map(|l| ExpiryWarning {
            stock_in_item_id: l.stock_in_item_id,
            days_left: days_until(today, l.expire_date),
            product_name: l.product_name,
            warehouse_name: l.warehouse_name,
            expire_date: l.expire_date,
            measurement_count: l.measurement_count,
        })
        .collect()
}

#[derive(Clone)]
pub struct ExpiryService {
    db: PgPool,
    notifier: ExpiryNotifier,
}

impl ExpiryService {
    pub fn new(db: PgPool, notifier: ExpiryNotifier) -> Self {
        Self { db, notifier }
    }

    /// Send every warning due on `today`; returns how many were delivered
    pub async fn run_check(&self, today: NaiveDate) -> AppResult<usize> {
        let lines = sqlx::query_as::<_, ExpiringLine>(
            r#"
            SELECT i.id AS stock_in_item_id,
                   p.name AS product_name,
                   w.name AS warehouse_name,
                   i.expire_date,
                   i.notify_before_day,
                   i.measurement_count
            FROM stock_in_item i
            JOIN stock_in s ON s.id = i.stock_in_id
            JOIN product p ON p.id = i.product_id
            JOIN warehouse w ON w.id = s.warehouse_id
            WHERE i.deleted = FALSE
              AND s.deleted = FALSE
              AND i.expire_date IS NOT NULL
              AND i.expire_date >= $1
            ORDER BY i.expire_date, i.id
            "#,
        )
        .bind(today)
        .fetch_all(&self.db)
        .await?;

        let warnings = warnings_for(today, lines);
        let mut sent = 0;
        for warning in &warnings {
            match self.notifier.notify(warning).await {
                Ok(()) => sent += 1,
                Err(e) => tracing::error!(
                    stock_in_item_id = warning.stock_in_item_id,
                    "Expiry notification failed: {}",
                    e
                ),
            }
        }

        tracing::info!(due = warnings.len(), sent, "Expiry check finished for {}", today);
        Ok(sent)
    }
}

/// Start the daily expiry loop; `None` when disabled
pub fn spawn_expiry_job(db: PgPool, config: ExpiryConfig) -> Option<JoinHandle<()>> {
    if !config.enabled {
        tracing::info!("Expiry check disabled");
        return None;
    }

    let service = ExpiryService::new(db, ExpiryNotifier::from_config(&config));

    Some(tokio::spawn(async move {
        loop {
            let now = Utc::now();
            let next = next_run_after(now, config.check_hour, config.check_minute);
            let wait = (next - now).to_std().unwrap_or(Duration::from_secs(60));
            tracing::debug!("Next expiry check at {}", next);
            tokio::time::sleep(wait).await;

            if let Err(e) = service.run_check(Utc::now().date_naive()).await {
                tracing::error!("Expiry check failed: {}", e);
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: i64, expire: NaiveDate, notify_before_day: i32) -> ExpiringLine {
        ExpiringLine {
            stock_in_item_id: id,
            product_name: "Yogurt".to_string(),
            warehouse_name: "Chilonzor".to_string(),
            expire_date: expire,
            notify_before_day,
            measurement_count: 20,
        }
    }

    #[test]
    fn test_only_lines_on_warning_day_are_selected() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let lines = vec![
            line(1, NaiveDate::from_ymd_opt(2024, 6, 4).unwrap(), 3),
            line(2, NaiveDate::from_ymd_opt(2024, 6, 5).unwrap(), 3),
            line(3, today, 0),
        ];

        let warnings = warnings_for(today, lines);
        let ids: Vec<i64> = warnings.iter().map(|w| w.stock_in_item_id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(warnings[0].days_left, 3);
        assert_eq!(warnings[1].days_left, 0);
    }

    #[test]
    fn test_notifier_defaults_to_log() {
        let config = ExpiryConfig {
            enabled: true,
            check_hour: 9,
            check_minute: 0,
            webhook_url: Some("  ".to_string()),
        };
        assert!(matches!(
            ExpiryNotifier::from_config(&config),
            ExpiryNotifier::Log
        ));
    }

    #[test]
    fn test_log_notifier_always_delivers() {
        let warning = warnings_for(
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            vec![line(9, NaiveDate::from_ymd_opt(2024, 6, 2).unwrap(), 1)],
        )
        .remove(0);
        let result = tokio_test::block_on(ExpiryNotifier::Log.notify(&warning));
        assert!(result.is_ok());
    }
}
