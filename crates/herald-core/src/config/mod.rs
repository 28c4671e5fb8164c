//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod cache;
pub mod channels;
pub mod database;
pub mod dispatch;
pub mod ingest;
pub mod logging;
pub mod scheduler;

use serde::{Deserialize, Serialize};

pub use self::cache::CacheConfig;
pub use self::channels::{ChannelGatewayConfig, ChannelsConfig, HealthConfig};
pub use self::database::DatabaseConfig;
pub use self::dispatch::DispatchConfig;
pub use self::ingest::IngestConfig;
pub use self::logging::LoggingConfig;
pub use self::scheduler::SchedulerConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database connection settings.
    pub database: DatabaseConfig,
    /// Preference cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Channel gateway settings.
    #[serde(default)]
    pub channels: ChannelsConfig,
    /// Dispatcher settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// Deferred promotion and retry sweep settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Upstream event bus settings.
    #[serde(default)]
    pub ingest: IngestConfig,
    /// Channel health monitoring settings.
    #[serde(default)]
    pub health: HealthConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `HERALD__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("HERALD")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot start with.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.database.url.trim().is_empty() {
            return Err(AppError::configuration("database.url must be set"));
        }
        if !matches!(self.cache.provider.as_str(), "memory" | "redis") {
            return Err(AppError::configuration(format!(
                "Unknown cache provider: '{}'. Supported: memory, redis",
                self.cache.provider
            )));
        }
        if !matches!(self.ingest.provider.as_str(), "memory" | "redis") {
            return Err(AppError::configuration(format!(
                "Unknown ingest provider: '{}'. Supported: memory, redis",
                self.ingest.provider
            )));
        }
        if self.scheduler.promotion_batch_size == 0 || self.scheduler.retry_batch_size == 0 {
            return Err(AppError::configuration(
                "scheduler batch sizes must be greater than zero",
            ));
        }
        Ok(())
    }
}
