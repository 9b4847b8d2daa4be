//! Error handling for the Warehouse Zero inventory backend
//!
//! Provides consistent error responses in English and Uzbek, each carrying a
//! numeric code from the platform error catalogue.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::StockError;
use thiserror::Error;

/// Entities that can be missing or duplicated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Warehouse,
    Employee,
    Category,
    Measurement,
    Product,
    Attach,
    Supplier,
    Currency,
    StockIn,
    StockOut,
    Balance,
}

impl Resource {
    /// Upper snake case name used in error codes
    pub fn code(&self) -> &'static str {
        match self {
            Resource::Warehouse => "WAREHOUSE",
            Resource::Employee => "EMPLOYEE",
            Resource::Category => "CATEGORY",
            Resource::Measurement => "MEASUREMENT",
            Resource::Product => "PRODUCT",
            Resource::Attach => "ATTACH",
            Resource::Supplier => "SUPPLIER",
            Resource::Currency => "CURRENCY",
            Resource::StockIn => "STOCK_IN",
            Resource::StockOut => "STOCK_OUT",
            Resource::Balance => "BALANCE",
        }
    }

    pub fn name_en(&self) -> &'static str {
        match self {
            Resource::Warehouse => "Warehouse",
            Resource::Employee => "Employee",
            Resource::Category => "Category",
            Resource::Measurement => "Measurement",
            Resource::Product => "Product",
            Resource::Attach => "Attachment",
            Resource::Supplier => "Supplier",
            Resource::Currency => "Currency",
            Resource::StockIn => "Stock-in document",
            Resource::StockOut => "Stock-out document",
            Resource::Balance => "Balance",
        }
    }

    pub fn name_uz(&self) -> &'static str {
        match self {
            Resource::Warehouse => "Ombor",
            Resource::Employee => "Xodim",
            Resource::Category => "Kategoriya",
            Resource::Measurement => "O'lchov birligi",
            Resource::Product => "Mahsulot",
            Resource::Attach => "Fayl",
            Resource::Supplier => "Yetkazib beruvchi",
            Resource::Currency => "Valyuta",
            Resource::StockIn => "Kirim hujjati",
            Resource::StockOut => "Chiqim hujjati",
            Resource::Balance => "Qoldiq",
        }
    }

    /// Numeric code for "not found"
    pub fn not_found_code(&self) -> i32 {
        match self {
            Resource::Warehouse => 101,
            Resource::Employee => 200,
            Resource::Category => 301,
            Resource::Measurement => 401,
            Resource::Product => 501,
            Resource::Attach => 601,
            Resource::Supplier => 701,
            Resource::Currency => 801,
            Resource::StockIn => 901,
            Resource::StockOut => 902,
            Resource::Balance => 903,
        }
    }

    /// Numeric code for "already exists"
    pub fn already_exists_code(&self) -> i32 {
        match self {
            Resource::Warehouse => 100,
            Resource::Employee => 201,
            Resource::Category => 300,
            Resource::Measurement => 400,
            Resource::Product => 500,
            Resource::Attach => 600,
            Resource::Supplier => 700,
            Resource::Currency => 800,
            Resource::StockIn => 904,
            Resource::StockOut => 905,
            Resource::Balance => 906,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid password")]
    InvalidPassword,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Unauthorized: {message}")]
    Unauthorized {
        message: String,
        message_uz: String,
    },

    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_uz: String,
    },

    #[error("{} already exists", .0.name_en())]
    AlreadyExists(Resource),

    #[error("{} not found", .0.name_en())]
    NotFound(Resource),

    #[error("Phone number already exists")]
    PhoneNumberTaken,

    // Business logic errors
    #[error("Category cannot be its own ancestor")]
    CategoryCycle,

    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: i64,
        available: i32,
        requested: i32,
    },

    #[error("Stock rule violated: {0}")]
    Stock(StockError),

    // Storage and external errors
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub numeric_code: i32,
    pub message_en: String,
    pub message_uz: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl AppError {
    /// Shorthand for a field validation failure
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        AppError::Validation {
            field: field.to_string(),
            message_uz: format!("Ma'lumot noto'g'ri: {}", message),
            message,
        }
    }

    /// Status code and body for this error
    pub fn to_detail(&self) -> (StatusCode, ErrorDetail) {
        match self {
            AppError::InvalidPassword => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "INVALID_PASSWORD".to_string(),
                    numeric_code: 202,
                    message_en: "Invalid phone number or password".to_string(),
                    message_uz: "Telefon raqam yoki parol noto'g'ri".to_string(),
                    field: None,
                },
            ),
            AppError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "TOKEN_EXPIRED".to_string(),
                    numeric_code: 11,
                    message_en: "Token has expired".to_string(),
                    message_uz: "Token muddati tugagan".to_string(),
                    field: None,
                },
            ),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "INVALID_TOKEN".to_string(),
                    numeric_code: 12,
                    message_en: "Invalid token".to_string(),
                    message_uz: "Token noto'g'ri".to_string(),
                    field: None,
                },
            ),
            AppError::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                ErrorDetail {
                    code: "INSUFFICIENT_PERMISSIONS".to_string(),
                    numeric_code: 13,
                    message_en: "You do not have permission to perform this action".to_string(),
                    message_uz: "Sizda bu amalni bajarish uchun ruxsat yo'q".to_string(),
                    field: None,
                },
            ),
            AppError::Forbidden(msg) => (
                StatusCode::FORBIDDEN,
                ErrorDetail {
                    code: "FORBIDDEN".to_string(),
                    numeric_code: 14,
                    message_en: msg.clone(),
                    message_uz: "Ruxsat berilmagan".to_string(),
                    field: None,
                },
            ),
            AppError::Unauthorized { message, message_uz } => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "UNAUTHORIZED".to_string(),
                    numeric_code: 203,
                    message_en: message.clone(),
                    message_uz: message_uz.clone(),
                    field: None,
                },
            ),
            AppError::Validation { field, message, message_uz } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    numeric_code: 10,
                    message_en: message.clone(),
                    message_uz: message_uz.clone(),
                    field: Some(field.clone()),
                },
            ),
            AppError::AlreadyExists(resource) => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: format!("{}_ALREADY_EXISTS", resource.code()),
                    numeric_code: resource.already_exists_code(),
                    message_en: format!("{} already exists", resource.name_en()),
                    message_uz: format!("{} allaqachon mavjud", resource.name_uz()),
                    field: None,
                },
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail {
                    code: format!("{}_NOT_FOUND", resource.code()),
                    numeric_code: resource.not_found_code(),
                    message_en: format!("{} not found", resource.name_en()),
                    message_uz: format!("{} topilmadi", resource.name_uz()),
                    field: None,
                },
            ),
            AppError::PhoneNumberTaken => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "PHONE_NUMBER_ALREADY_EXISTS".to_string(),
                    numeric_code: 702,
                    message_en: "Phone number already exists".to_string(),
                    message_uz: "Bu telefon raqam allaqachon mavjud".to_string(),
                    field: Some("phone_number".to_string()),
                },
            ),
            AppError::CategoryCycle => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "CATEGORY_CYCLE".to_string(),
                    numeric_code: 302,
                    message_en: "A category cannot be moved under itself or its descendants"
                        .to_string(),
                    message_uz: "Kategoriyani o'zining ichiga ko'chirib bo'lmaydi".to_string(),
                    field: Some("parent_id".to_string()),
                },
            ),
            AppError::InsufficientStock {
                product_id,
                available,
                requested,
            } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "INSUFFICIENT_STOCK".to_string(),
                    numeric_code: 900,
                    message_en: format!(
                        "Insufficient stock for product {}: available {}, requested {}",
                        product_id, available, requested
                    ),
                    message_uz: format!(
                        "Mahsulot {} yetarli emas: mavjud {}, so'ralgan {}",
                        product_id, available, requested
                    ),
                    field: None,
                },
            ),
            AppError::Stock(err) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "STOCK_RULE_VIOLATION".to_string(),
                    numeric_code: 907,
                    message_en: err.to_string(),
                    message_uz: format!("Ombor qoidasi buzildi: {}", err),
                    field: None,
                },
            ),
            AppError::StorageError(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorDetail {
                    code: "STORAGE_ERROR".to_string(),
                    numeric_code: 602,
                    message_en: format!("Storage error: {}", msg),
                    message_uz: format!("Faylni saqlashda xatolik: {}", msg),
                    field: None,
                },
            ),
            AppError::ExternalService(msg) => (
                StatusCode::BAD_GATEWAY,
                ErrorDetail {
                    code: "EXTERNAL_SERVICE_ERROR".to_string(),
                    numeric_code: 16,
                    message_en: format!("External service error: {}", msg),
                    message_uz: format!("Tashqi xizmat xatoligi: {}", msg),
                    field: None,
                },
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "DATABASE_ERROR".to_string(),
                    numeric_code: 17,
                    message_en: "A database error occurred".to_string(),
                    message_uz: "Ma'lumotlar bazasida xatolik yuz berdi".to_string(),
                    field: None,
                },
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    numeric_code: 18,
                    message_en: msg.clone(),
                    message_uz: "Serverda ichki xatolik".to_string(),
                    field: None,
                },
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = self.to_detail();

        // Log the error for debugging
        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

impl From<StockError> for AppError {
    fn from(err: StockError) -> Self {
        AppError::Stock(err)
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field_errors = errors.field_errors();
        let mut fields: Vec<_> = field_errors.iter().collect();
        fields.sort_by_key(|(field, _)| **field);

        match fields.first() {
            Some((field, errs)) => {
                let message = errs
                    .first()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .unwrap_or_else(|| "invalid value".to_string());
                AppError::validation(field, format!("{}: {}", field, message))
            }
            None => AppError::validation("body", "Invalid request body"),
        }
    }
}

/// Translate a unique-constraint violation into a conflict for `resource`
pub fn map_unique_violation(err: sqlx::Error, resource: Resource) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return AppError::AlreadyExists(resource);
        }
    }
    err.into()
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
