//! Configuration management for the Warehouse Zero inventory backend
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with WMS_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// Product attachment storage
    pub attach: AttachConfig,

    /// Daily expiry check
    pub expiry: ExpiryConfig,

    /// First administrator account
    pub bootstrap: BootstrapConfig,

    /// Log output
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for signing JWT tokens
    pub secret: String,

    /// Access token expiration in seconds
    pub access_token_expiry: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AttachConfig {
    /// Root folder uploads are written under
    pub upload_folder: String,

    /// Public base URL used to build open links
    pub url: String,

    /// Largest accepted upload in bytes
    pub max_file_size: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExpiryConfig {
    pub enabled: bool,

    /// Hour of the daily run (UTC)
    pub check_hour: u32,

    /// Minute of the daily run (UTC)
    pub check_minute: u32,

    /// Optional JSON webhook receiving each warning; warnings are only logged when unset
    pub webhook_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BootstrapConfig {
    pub admin_phone: Option<String>,
    pub admin_password: Option<String>,
    pub admin_first_name: String,
    pub admin_last_name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("WMS_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        Self::builder(&environment)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (WMS_ prefix)
            .add_source(
                Environment::with_prefix("WMS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Builder preloaded with every default value
    fn builder(
        environment: &str,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        config::Config::builder()
            .set_default("environment", environment)?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("jwt.access_token_expiry", 86400)?
            .set_default("attach.upload_folder", "attaches")?
            .set_default("attach.url", "http://localhost:3000/api/v1/attaches")?
            .set_default("attach.max_file_size", 10 * 1024 * 1024)?
            .set_default("expiry.enabled", true)?
            .set_default("expiry.check_hour", 9)?
            .set_default("expiry.check_minute", 0)?
            .set_default("bootstrap.admin_first_name", "Admin")?
            .set_default("bootstrap.admin_last_name", "Admin")?
            .set_default("logging.json", false)
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

#[cfg(test)]
impl Config {
    /// Defaults plus the required values, for tests that need a full config
    pub(crate) fn for_tests() -> Self {
        Self::builder("test")
            .and_then(|b| b.set_override("database.url", "postgres://localhost/warehouse_test"))
            .and_then(|b| b.set_override("jwt.secret", "test-secret"))
            .and_then(|b| b.build())
            .and_then(|c| c.try_deserialize())
            .expect("test configuration")
    }
}
