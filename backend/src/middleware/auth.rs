//! Authentication middleware
//!
//! JWT authentication and the admin guard

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use shared::Role;

use crate::error::{AppError, AppResult};
use crate::repository::Repository;
use crate::services::auth::decode_token;
use crate::services::employee::Employee;
use crate::AppState;

/// Authenticated employee extracted from the JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub employee_id: i64,
    pub phone: String,
    pub role: Role,
    pub warehouse_id: Option<i64>,
}

impl AuthUser {
    /// Current rights of a stored employee; the token only identifies who is calling
    pub fn from_employee(employee: &Employee) -> Self {
        Self {
            employee_id: employee.id,
            phone: employee.phone_number.clone(),
            role: employee.role,
            warehouse_id: employee.warehouse_id,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Fail unless the user is an administrator
    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::InsufficientPermissions)
        }
    }

    /// Name recorded in `created_by` / `updated_by`
    pub fn actor(&self) -> &str {
        &self.phone
    }
}

/// Authentication middleware that validates JWT tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) => token,
        None => return missing_token().into_response(),
    };

    let claims = match decode_token(token, &state.config.jwt.secret) {
        Ok(claims) => claims,
        Err(err) => return err.into_response(),
    };

    let employee_id = match claims.sub.parse::<i64>() {
        Ok(id) => id,
        Err(_) => return AppError::InvalidToken.into_response(),
    };

    let employee = match Repository::<Employee>::find_active(&state.db, employee_id).await {
        Ok(Some(employee)) => employee,
        Ok(None) => {
            tracing::debug!(employee_id, "Token presented for an inactive or deleted employee");
            return inactive_account().into_response();
        }
        Err(err) => return err.into_response(),
    };

    request
        .extensions_mut()
        .insert(AuthUser::from_employee(&employee));

    next.run(request).await
}

fn missing_token() -> AppError {
    AppError::Unauthorized {
        message: "Missing or invalid Authorization header".to_string(),
        message_uz: "Avtorizatsiya sarlavhasi yo'q yoki noto'g'ri".to_string(),
    }
}

fn inactive_account() -> AppError {
    AppError::Unauthorized {
        message: "Employee account is inactive or deleted".to_string(),
        message_uz: "Xodim hisobi faol emas yoki o'chirilgan".to_string(),
    }
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized {
                message: "Authentication required".to_string(),
                message_uz: "Avval tizimga kiring".to_string(),
            })
    }
}
