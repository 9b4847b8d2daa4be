//! HTTP handlers for category endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::PaginatedResponse;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::models::PageQuery;
use crate::services::category::{Category, CreateCategoryInput, UpdateCategoryInput};
use crate::services::CategoryService;
use crate::AppState;

pub async fn create_category(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateCategoryInput>,
) -> AppResult<(StatusCode, Json<Category>)> {
    current_user.0.require_admin()?;
    let service = CategoryService::new(state.db);
    let category = service.create(input, current_user.0.actor()).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn get_category(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(category_id): Path<i64>,
) -> AppResult<Json<Category>> {
    let service = CategoryService::new(state.db);
    Ok(Json(service.get(category_id).await?))
}

pub async fn list_categories(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PaginatedResponse<Category>>> {
    let service = CategoryService::new(state.db);
    Ok(Json(service.list(query.pagination()).await?))
}

pub async fn update_category(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(category_id): Path<i64>,
    Json(input): Json<UpdateCategoryInput>,
) -> AppResult<Json<Category>> {
    current_user.0.require_admin()?;
    let service = CategoryService::new(state.db);
    let category = service
        .update(category_id, input, current_user.0.actor())
        .await?;
    Ok(Json(category))
}

pub async fn delete_category(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(category_id): Path<i64>,
) -> AppResult<StatusCode> {
    current_user.0.require_admin()?;
    let service = CategoryService::new(state.db);
    service.delete(category_id, current_user.0.actor()).await?;
    Ok(StatusCode::NO_CONTENT)
}
