//! Business logic services for the Warehouse Zero inventory backend

pub mod attach;
pub mod auth;
pub mod balance;
pub mod category;
pub mod currency;
pub mod employee;
pub mod expiry;
pub mod measurement;
pub mod product;
pub mod stock_in;
pub mod stock_out;
pub mod supplier;
pub mod warehouse;

#[cfg(test)]
pub(crate) mod fixtures;

pub use attach::AttachService;
pub use auth::AuthService;
pub use balance::BalanceService;
pub use category::CategoryService;
pub use currency::CurrencyService;
pub use employee::EmployeeService;
pub use expiry::ExpiryService;
pub use measurement::MeasurementService;
pub use product::ProductService;
pub use stock_in::StockInService;
pub use stock_out::StockOutService;
pub use supplier::SupplierService;
pub use warehouse::WarehouseService;
