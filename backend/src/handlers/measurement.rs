//! HTTP handlers for measurement and currency endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::PaginatedResponse;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::models::PageQuery;
use crate::services::currency::{Currency, CurrencyInput};
use crate::services::measurement::{Measurement, MeasurementInput};
use crate::services::{CurrencyService, MeasurementService};
use crate::AppState;

// ============================================================================
// Measurements
// ============================================================================

pub async fn create_measurement(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<MeasurementInput>,
) -> AppResult<(StatusCode, Json<Measurement>)> {
    current_user.0.require_admin()?;
    let service = MeasurementService::new(state.db);
    let measurement = service.create(input, current_user.0.actor()).await?;
    Ok((StatusCode::CREATED, Json(measurement)))
}

pub async fn get_measurement(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(measurement_id): Path<i64>,
) -> AppResult<Json<Measurement>> {
    let service = MeasurementService::new(state.db);
    Ok(Json(service.get(measurement_id).await?))
}

pub async fn list_measurements(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PaginatedResponse<Measurement>>> {
    let service = MeasurementService::new(state.db);
    Ok(Json(service.list(query.pagination()).await?))
}

pub async fn update_measurement(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(measurement_id): Path<i64>,
    Json(input): Json<MeasurementInput>,
) -> AppResult<Json<Measurement>> {
    current_user.0.require_admin()?;
    let service = MeasurementService::new(state.db);
    let measurement = service
        .update(measurement_id, input, current_user.0.actor())
        .await?;
    Ok(Json(measurement))
}

pub async fn delete_measurement(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(measurement_id): Path<i64>,
) -> AppResult<StatusCode> {
    current_user.0.require_admin()?;
    let service = MeasurementService::new(state.db);
    service.delete(measurement_id, current_user.0.actor()).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Currencies
// ============================================================================

pub async fn create_currency(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CurrencyInput>,
) -> AppResult<(StatusCode, Json<Currency>)> {
    current_user.0.require_admin()?;
    let service = CurrencyService::new(state.db);
    let currency = service.create(input, current_user.0.actor()).await?;
    Ok((StatusCode::CREATED, Json(currency)))
}

pub async fn get_currency(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(currency_id): Path<i64>,
) -> AppResult<Json<Currency>> {
    let service = CurrencyService::new(state.db);
    Ok(Json(service.get(currency_id).await?))
}

pub async fn list_currencies(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PaginatedResponse<Currency>>> {
    let service = CurrencyService::new(state.db);
    Ok(Json(service.list(query.pagination()).await?))
}

pub async fn update_currency(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(currency_id): Path<i64>,
    Json(input): Json<CurrencyInput>,
) -> AppResult<Json<Currency>> {
    current_user.0.require_admin()?;
    let service = CurrencyService::new(state.db);
    let currency = service
        .update(currency_id, input, current_user.0.actor())
        .await?;
    Ok(Json(currency))
}

pub async fn delete_currency(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(currency_id): Path<i64>,
) -> AppResult<StatusCode> {
    current_user.0.require_admin()?;
    let service = CurrencyService::new(state.db);
    service.delete(currency_id, current_user.0.actor()).await?;
    Ok(StatusCode::NO_CONTENT)
}
