//! HTTP handlers for authentication endpoints

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::services::auth::{AuthToken, LoginInput};
use crate::services::AuthService;
use crate::AppState;

/// Exchange phone number and password for an access token
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> AppResult<Json<AuthToken>> {
    let service = AuthService::new(state.db, &state.config);
    let token = service.login(input).await?;
    Ok(Json(token))
}
