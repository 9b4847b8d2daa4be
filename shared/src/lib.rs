//! Shared types and domain rules for the Warehouse Zero inventory platform
//!
//! This crate holds everything that does not need a database: status enums,
//! stock balance arithmetic, expiry scheduling, attachment naming, generated
//! codes and input validation.

pub mod codes;
pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
