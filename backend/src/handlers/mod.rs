//! HTTP request handlers

pub mod attach;
pub mod auth;
pub mod balance;
pub mod category;
pub mod employee;
pub mod expiry;
pub mod health;
pub mod measurement;
pub mod product;
pub mod stock;
pub mod supplier;
pub mod warehouse;

pub use attach::*;
pub use auth::*;
pub use balance::*;
pub use category::*;
pub use employee::*;
pub use expiry::*;
pub use health::*;
pub use measurement::*;
pub use product::*;
pub use stock::*;
pub use supplier::*;
pub use warehouse::*;
