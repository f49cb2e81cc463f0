//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment
//! variables using the `config` and `dotenvy` crates. Configuration is
//! loaded with the `PAYRAIL` prefix and nested values use double
//! underscores as separators; a handful of flat legacy variables
//! (`PORT`, `DATABASE_URL`, `REDIS_URL`, `SCHEDULER_INTERVAL`,
//! `PROCESSOR_A_URL`, `PROCESSOR_B_URL`) are honored as overrides.
//!
//! # Example
//!
//! ```no_run
//! use payrail::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {}", config.server.socket_addr());
//! ```

mod database;
mod error;
mod processors;
mod redis;
mod routing;
mod scheduler;
mod server;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use processors::ProcessorsConfig;
pub use redis::RedisConfig;
pub use routing::RoutingConfig;
pub use scheduler::SchedulerConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Contains all configuration sections for the payrail service.
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Redis configuration (idempotency cache)
    #[serde(default)]
    pub redis: RedisConfig,

    /// Upstream processor endpoints and deadlines
    #[serde(default)]
    pub processors: ProcessorsConfig,

    /// Rule engine configuration
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Recurring-billing scheduler configuration
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with the `PAYRAIL` prefix
    ///    (`PAYRAIL__DATABASE__URL=...` -> `database.url = ...`)
    /// 3. Applies flat legacy overrides (`PORT`, `DATABASE_URL`, ...)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into the
    /// expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let mut config: AppConfig = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("PAYRAIL")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        config.apply_legacy_env();
        Ok(config)
    }

    /// Apply the flat environment variables the deployment tooling sets.
    fn apply_legacy_env(&mut self) {
        if let Ok(port) = std::env::var("PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(url) = std::env::var("REDIS_URL") {
            self.redis.url = url;
        }
        if let Ok(url) = std::env::var("PROCESSOR_A_URL") {
            self.processors.processor_a_url = url;
        }
        if let Ok(url) = std::env::var("PROCESSOR_B_URL") {
            self.processors.processor_b_url = url;
        }
        if let Ok(interval) = std::env::var("SCHEDULER_INTERVAL") {
            if let Ok(secs) = interval.parse() {
                self.scheduler.tick_interval_secs = secs;
            }
        }
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.redis.validate()?;
        self.processors.validate()?;
        self.routing.validate()?;
        self.scheduler.validate()?;
        Ok(())
    }
}
