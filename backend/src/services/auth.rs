//! Authentication service for employee login and token management

use bcrypt::verify;
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use shared::{Role, Status};
use sqlx::PgPool;
use validator::Validate;

use crate::config::{BootstrapConfig, Config};
use crate::error::{AppError, AppResult, Resource};
use crate::repository::SYSTEM_ACTOR;
use crate::services::employee::{CreateEmployeeInput, Employee, EmployeeService};

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    jwt_secret: String,
    access_token_expiry: i64,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(custom = "crate::validation::phone_number")]
    pub phone_number: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Issued access token
#[derive(Debug, Serialize)]
pub struct AuthToken {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Employee ID
    pub phone: String,
    pub role: Role,
    pub warehouse_id: Option<i64>,
    pub exp: i64,
    pub iat: i64,
}

/// Decode and validate a token signed with `secret`
pub fn decode_token(token: &str, secret: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::TokenExpired,
        _ => AppError::InvalidToken,
    })
}

/// Sign claims for `employee`, valid for `expiry_secs`
pub fn encode_token(employee: &Employee, secret: &str, expiry_secs: i64) -> AppResult<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: employee.id.to_string(),
        phone: employee.phone_number.clone(),
        role: employee.role,
        warehouse_id: employee.warehouse_id,
        exp: (now + Duration::seconds(expiry_secs)).timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

impl AuthService {
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            jwt_secret: config.jwt.secret.clone(),
            access_token_expiry: config.jwt.access_token_expiry,
        }
    }

    /// Authenticate an employee by phone number and password
    pub async fn login(&self, input: LoginInput) -> AppResult<AuthToken> {
        input.validate()?;

        let employee = EmployeeService::new(self.db.clone())
            .find_by_phone(&input.phone_number)
            .await?
            .ok_or(AppError::NotFound(Resource::Employee))?;

        if employee.audit.status != Status::Active {
            return Err(AppError::Unauthorized {
                message: "Account is disabled".to_string(),
                message_uz: "Hisob faol emas".to_string(),
            });
        }

        let valid = verify(&input.password, &employee.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;

        if !valid {
            tracing::warn!(employee_id = employee.id, "Rejected login with wrong password");
            return Err(AppError::InvalidPassword);
        }

        let token = encode_token(&employee, &self.jwt_secret, self.access_token_expiry)?;
        tracing::info!(employee_id = employee.id, "Employee logged in");

        Ok(AuthToken {
            token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry,
        })
    }
}

/// Create the configured administrator when no admin account exists yet
pub async fn bootstrap_admin(db: &PgPool, bootstrap: &BootstrapConfig) -> AppResult<()> {
    let (Some(phone), Some(password)) = (&bootstrap.admin_phone, &bootstrap.admin_password) else {
        tracing::debug!("No bootstrap administrator configured");
        return Ok(());
    };

    let employees = EmployeeService::new(db.clone());
    if employees.admin_exists().await? {
        return Ok(());
    }

    let admin = employees
        .create(
            CreateEmployeeInput {
                first_name: bootstrap.admin_first_name.clone(),
                last_name: bootstrap.admin_last_name.clone(),
                phone_number: phone.clone(),
                password: password.clone(),
                warehouse_id: None,
                role: Some(Role::Admin),
            },
            SYSTEM_ACTOR,
        )
        .await?;

    tracing::info!(employee_id = admin.id, "Bootstrap administrator created");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::Audit;

    fn employee(role: Role) -> Employee {
        let now = Utc::now();
        Employee {
            id: 42,
            first_name: "Ali".to_string(),
            last_name: "Valiyev".to_string(),
            phone_number: "+998901234567".to_string(),
            unique_number: "aB3dE5gH7j".to_string(),
            password_hash: String::new(),
            warehouse_id: Some(3),
            role,
            audit: Audit {
                created_at: now,
                updated_at: now,
                created_by: None,
                updated_by: None,
                deleted: false,
                status: Status::Active,
            },
        }
    }

    #[test]
    fn test_token_round_trip_carries_employee() {
        let token = encode_token(&employee(Role::Admin), "secret", 3600).unwrap();
        let claims = decode_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.phone, "+998901234567");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.warehouse_id, Some(3));
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = encode_token(&employee(Role::Employee), "secret", 3600).unwrap();
        assert!(matches!(
            decode_token(&token, "other"),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_token_is_reported() {
        // Well past the default 60 second leeway
        let token = encode_token(&employee(Role::Employee), "secret", -3600).unwrap();
        assert!(matches!(
            decode_token(&token, "secret"),
            Err(AppError::TokenExpired)
        ));
    }
}
