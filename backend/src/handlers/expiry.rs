//! HTTP handler for running the expiry check on demand

use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::expiry::{ExpiryNotifier, ExpiryService};
use crate::AppState;

#[derive(Serialize)]
pub struct ExpiryRunResponse {
    pub sent: usize,
}

/// Run today's expiry check now (admin)
pub async fn run_expiry_check(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<ExpiryRunResponse>> {
    current_user.0.require_admin()?;
    let notifier = ExpiryNotifier::from_config(&state.config.expiry);
    let service = ExpiryService::new(state.db, notifier);
    let sent = service.run_check(Utc::now().date_naive()).await?;
    Ok(Json(ExpiryRunResponse { sent }))
}
