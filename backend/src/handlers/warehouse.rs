//! HTTP handlers for warehouse endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::PaginatedResponse;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::models::{PageQuery, StatusInput};
use crate::services::warehouse::{Warehouse, WarehouseInput};
use crate::services::WarehouseService;
use crate::AppState;

/// Create a warehouse (admin)
pub async fn create_warehouse(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<WarehouseInput>,
) -> AppResult<(StatusCode, Json<Warehouse>)> {
    current_user.0.require_admin()?;
    let service = WarehouseService::new(state.db);
    let warehouse = service.create(input, current_user.0.actor()).await?;
    Ok((StatusCode::CREATED, Json(warehouse)))
}

pub async fn get_warehouse(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(warehouse_id): Path<i64>,
) -> AppResult<Json<Warehouse>> {
    let service = WarehouseService::new(state.db);
    Ok(Json(service.get(warehouse_id).await?))
}

pub async fn list_warehouses(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PaginatedResponse<Warehouse>>> {
    let service = WarehouseService::new(state.db);
    Ok(Json(service.list(query.pagination()).await?))
}

/// Rename a warehouse (admin)
pub async fn update_warehouse(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(warehouse_id): Path<i64>,
    Json(input): Json<WarehouseInput>,
) -> AppResult<Json<Warehouse>> {
    current_user.0.require_admin()?;
    let service = WarehouseService::new(state.db);
    let warehouse = service
        .update(warehouse_id, input, current_user.0.actor())
        .await?;
    Ok(Json(warehouse))
}

/// Soft delete a warehouse (admin)
pub async fn delete_warehouse(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(warehouse_id): Path<i64>,
) -> AppResult<StatusCode> {
    current_user.0.require_admin()?;
    let service = WarehouseService::new(state.db);
    service.delete(warehouse_id, current_user.0.actor()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Activate or deactivate a warehouse (admin)
pub async fn set_warehouse_status(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(warehouse_id): Path<i64>,
    Json(input): Json<StatusInput>,
) -> AppResult<Json<Warehouse>> {
    current_user.0.require_admin()?;
    let service = WarehouseService::new(state.db);
    let warehouse = service
        .set_status(warehouse_id, input.status, current_user.0.actor())
        .await?;
    Ok(Json(warehouse))
}
