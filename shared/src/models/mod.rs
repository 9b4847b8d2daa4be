//! Domain models and rules for the warehouse inventory platform

mod attach;
mod common;
mod employee;
mod expiry;
mod stock;

pub use attach::*;
pub use common::*;
pub use employee::*;
pub use expiry::*;
pub use stock::*;
