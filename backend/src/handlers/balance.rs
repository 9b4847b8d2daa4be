//! HTTP handlers for warehouse balances

use axum::{
    extract::{Path, Query, State},
    Json,
};
use shared::PaginatedResponse;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::models::PageQuery;
use crate::services::balance::ProductBalance;
use crate::services::BalanceService;
use crate::AppState;

pub async fn list_balances(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(warehouse_id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PaginatedResponse<ProductBalance>>> {
    let service = BalanceService::new(state.db);
    Ok(Json(service.list(warehouse_id, query.pagination()).await?))
}

pub async fn get_balance(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path((warehouse_id, product_id)): Path<(i64, i64)>,
) -> AppResult<Json<ProductBalance>> {
    let service = BalanceService::new(state.db);
    Ok(Json(service.get(warehouse_id, product_id).await?))
}
