//! HTTP handlers for product endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use shared::PaginatedResponse;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::models::PageQuery;
use crate::services::product::{Product, ProductDetails, ProductInput};
use crate::services::ProductService;
use crate::AppState;

pub async fn create_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<ProductInput>,
) -> AppResult<(StatusCode, Json<Product>)> {
    current_user.0.require_admin()?;
    let service = ProductService::new(state.db);
    let product = service.create(input, current_user.0.actor()).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Product with its latest stock-in prices
pub async fn get_product(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(product_id): Path<i64>,
) -> AppResult<Json<ProductDetails>> {
    let service = ProductService::new(state.db);
    Ok(Json(service.get_details(product_id).await?))
}

pub async fn list_products(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PaginatedResponse<Product>>> {
    let service = ProductService::new(state.db);
    Ok(Json(service.list(query.pagination()).await?))
}

pub async fn update_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<i64>,
    Json(input): Json<ProductInput>,
) -> AppResult<Json<Product>> {
    current_user.0.require_admin()?;
    let service = ProductService::new(state.db);
    let product = service
        .update(product_id, input, current_user.0.actor())
        .await?;
    Ok(Json(product))
}

pub async fn delete_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<i64>,
) -> AppResult<StatusCode> {
    current_user.0.require_admin()?;
    let service = ProductService::new(state.db);
    service.delete(product_id, current_user.0.actor()).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct DeleteProductsInput {
    pub ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct DeleteProductsResponse {
    pub deleted: usize,
}

/// Bulk soft delete (admin)
pub async fn delete_products(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<DeleteProductsInput>,
) -> AppResult<Json<DeleteProductsResponse>> {
    current_user.0.require_admin()?;
    let service = ProductService::new(state.db);
    let deleted = service.delete_many(&input.ids, current_user.0.actor()).await?;
    Ok(Json(DeleteProductsResponse { deleted }))
}
