//! HTTP handlers for employee endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::PaginatedResponse;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::models::{PageQuery, StatusInput};
use crate::services::employee::{CreateEmployeeInput, Employee, UpdateEmployeeInput};
use crate::services::EmployeeService;
use crate::AppState;

/// Create an employee account (admin)
pub async fn create_employee(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateEmployeeInput>,
) -> AppResult<(StatusCode, Json<Employee>)> {
    current_user.0.require_admin()?;
    let service = EmployeeService::new(state.db);
    let employee = service.create(input, current_user.0.actor()).await?;
    Ok((StatusCode::CREATED, Json(employee)))
}

/// Profile of the logged-in employee
pub async fn get_me(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Employee>> {
    let service = EmployeeService::new(state.db);
    Ok(Json(service.get(current_user.0.employee_id).await?))
}

pub async fn get_employee(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(employee_id): Path<i64>,
) -> AppResult<Json<Employee>> {
    if current_user.0.employee_id != employee_id {
        current_user.0.require_admin()?;
    }
    let service = EmployeeService::new(state.db);
    Ok(Json(service.get(employee_id).await?))
}

pub async fn list_employees(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PaginatedResponse<Employee>>> {
    current_user.0.require_admin()?;
    let service = EmployeeService::new(state.db);
    Ok(Json(service.list(query.pagination()).await?))
}

/// Partial update; only admins may change role or warehouse
pub async fn update_employee(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(employee_id): Path<i64>,
    Json(input): Json<UpdateEmployeeInput>,
) -> AppResult<Json<Employee>> {
    let user = &current_user.0;
    if !user.is_admin() {
        if user.employee_id != employee_id {
            return Err(AppError::InsufficientPermissions);
        }
        if input.role.is_some() || input.warehouse_id.is_some() {
            return Err(AppError::Forbidden(
                "Only administrators can change role or warehouse".to_string(),
            ));
        }
    }

    let service = EmployeeService::new(state.db);
    let employee = service.update(employee_id, input, user.actor()).await?;
    Ok(Json(employee))
}

pub async fn delete_employee(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(employee_id): Path<i64>,
) -> AppResult<StatusCode> {
    current_user.0.require_admin()?;
    let service = EmployeeService::new(state.db);
    service.delete(employee_id, current_user.0.actor()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Activate or deactivate an account (admin)
pub async fn set_employee_status(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(employee_id): Path<i64>,
    Json(input): Json<StatusInput>,
) -> AppResult<Json<Employee>> {
    current_user.0.require_admin()?;
    let service = EmployeeService::new(state.db);
    let employee = service
        .set_status(employee_id, input.status, current_user.0.actor())
        .await?;
    Ok(Json(employee))
}
