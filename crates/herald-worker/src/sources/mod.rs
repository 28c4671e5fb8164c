//! Event source backends.

use std::sync::Arc;

use herald_core::config::IngestConfig;
use herald_core::error::AppError;
use herald_core::result::AppResult;
use herald_core::traits::EventSource;

pub mod memory;
#[cfg(feature = "redis-source")]
pub mod redis;

pub use memory::MemoryEventSource;
#[cfg(feature = "redis-source")]
pub use self::redis::RedisEventSource;

/// Build the event source named in the ingest configuration.
pub async fn from_config(config: &IngestConfig) -> AppResult<Arc<dyn EventSource>> {
    match config.provider.as_str() {
        "memory" => {
            tracing::info!("Using in-process event source");
            Ok(Arc::new(MemoryEventSource::new()))
        }
        #[cfg(feature = "redis-source")]
        "redis" => {
            tracing::info!("Using Redis list event source");
            Ok(Arc::new(RedisEventSource::connect(&config.redis_url).await?))
        }
        other => Err(AppError::configuration(format!(
            "Unknown ingest provider: '{other}'. Supported: memory, redis"
        ))),
    }
}
