//! HTTP handlers for stock-in and stock-out documents

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::PaginatedResponse;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::models::{DailyReportQuery, DocumentQuery};
use crate::services::stock_in::{CreateStockInInput, DailyProductReport, StockIn, StockInDocument};
use crate::services::stock_out::{CreateStockOutInput, StockOut, StockOutDocument};
use crate::services::{StockInService, StockOutService};
use crate::AppState;

// ============================================================================
// Stock-in
// ============================================================================

/// Receive goods; a repeated `unique_number` returns the first document
pub async fn create_stock_in(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateStockInInput>,
) -> AppResult<(StatusCode, Json<StockInDocument>)> {
    let service = StockInService::new(state.db);
    let document = service.create(input, current_user.0.actor()).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

pub async fn get_stock_in(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(stock_in_id): Path<i64>,
) -> AppResult<Json<StockInDocument>> {
    let service = StockInService::new(state.db);
    Ok(Json(service.get(stock_in_id).await?))
}

pub async fn list_stock_ins(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<DocumentQuery>,
) -> AppResult<Json<PaginatedResponse<StockIn>>> {
    let service = StockInService::new(state.db);
    let page = service
        .list(query.warehouse_id, query.pagination())
        .await?;
    Ok(Json(page))
}

/// Products received on a given day
pub async fn daily_stock_in_report(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<DailyReportQuery>,
) -> AppResult<Json<Vec<DailyProductReport>>> {
    let service = StockInService::new(state.db);
    let report = service.daily_report(query.date, query.warehouse_id).await?;
    Ok(Json(report))
}

// ============================================================================
// Stock-out
// ============================================================================

/// Issue goods; fails as a whole when any product is short
pub async fn create_stock_out(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateStockOutInput>,
) -> AppResult<(StatusCode, Json<StockOutDocument>)> {
    let service = StockOutService::new(state.db);
    let document = service.create(input, &current_user.0).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

pub async fn get_stock_out(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(stock_out_id): Path<i64>,
) -> AppResult<Json<StockOutDocument>> {
    let service = StockOutService::new(state.db);
    Ok(Json(service.get(stock_out_id).await?))
}

pub async fn list_stock_outs(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<DocumentQuery>,
) -> AppResult<Json<PaginatedResponse<StockOut>>> {
    let service = StockOutService::new(state.db);
    let page = service
        .list(query.warehouse_id, query.pagination())
        .await?;
    Ok(Json(page))
}

/// Products issued on a given day
pub async fn daily_stock_out_report(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<DailyReportQuery>,
) -> AppResult<Json<Vec<DailyProductReport>>> {
    let service = StockOutService::new(state.db);
    let report = service.daily_report(query.date, query.warehouse_id).await?;
    Ok(Json(report))
}
