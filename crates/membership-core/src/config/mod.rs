//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod auth;
pub mod database;
pub mod logging;
pub mod session;

use serde::{Deserialize, Serialize};

pub use self::auth::{AuthConfig, HashingConfig};
pub use self::database::DatabaseConfig;
pub use self::logging::LoggingConfig;
pub use self::session::SessionConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (base file + environment overlay + env vars).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Backing store connection settings.
    pub database: DatabaseConfig,
    /// Credential and policy settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Session key and token settings.
    #[serde(default)]
    pub session: SessionConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// Merges the given file with an environment-specific overlay
    /// (`config/{MEMBERSHIP_ENV}.toml`) and environment variables prefixed
    /// with `MEMBERSHIP__` (e.g. `MEMBERSHIP__DATABASE__URL`).
    pub fn load(path: &str) -> Result<Self, AppError> {
        Self::load_with_database_url(path, None)
    }

    /// Like [`Self::load`], with the store URL forced to `database_url`
    /// when one is given.
    pub fn load_with_database_url(
        path: &str,
        database_url: Option<&str>,
    ) -> Result<Self, AppError> {
        let env = std::env::var("MEMBERSHIP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("MEMBERSHIP")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("database.url", database_url)?
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }

    /// Build a configuration for the given store URL with every other
    /// section at its defaults.
    pub fn with_database_url(url: impl Into<String>) -> Self {
        Self {
            database: DatabaseConfig::new(url),
            auth: AuthConfig::default(),
            session: SessionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
