//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `AZORA_QUOTA_` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use azora_quota::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {}", config.server.socket_addr());
//! ```

mod database;
mod error;
mod ledger;
mod redis;
mod server;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use ledger::{LedgerBackend, LedgerConfig};
pub use redis::RedisConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
/// The database and Redis sections only need to be filled in when the
/// ledger backend that uses them is selected.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Usage ledger backend selection
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Database configuration (PostgreSQL connection)
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Redis configuration (shared counters)
    #[serde(default)]
    pub redis: RedisConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `AZORA_QUOTA` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `AZORA_QUOTA__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `AZORA_QUOTA__LEDGER__BACKEND=postgres` -> `ledger.backend = postgres`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("AZORA_QUOTA")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// The database and Redis sections are validated only when the
    /// selected ledger backend needs them.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        match self.ledger.backend {
            LedgerBackend::Memory => {}
            LedgerBackend::Postgres => self.database.validate()?,
            LedgerBackend::Redis => self.redis.validate()?,
        }
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
