//! Redis connection management.

use redis::Client;
use redis::aio::ConnectionManager;
use tracing::info;

use herald_core::config::cache::RedisCacheConfig;
use herald_core::error::{AppError, ErrorKind};
use herald_core::result::AppResult;

/// Redis client wrapper holding a reconnecting connection manager.
#[derive(Debug, Clone)]
pub struct RedisClient {
    conn: ConnectionManager,
    key_prefix: String,
}

impl RedisClient {
    /// Connect to the Redis instance named in the cache configuration.
    pub async fn connect(config: &RedisCacheConfig) -> AppResult<Self> {
        info!(url = %mask_redis_url(&config.url), "Connecting preference cache to Redis");

        let client = Client::open(config.url.as_str()).map_err(|e| {
            AppError::with_source(ErrorKind::Cache, "Failed to create Redis client", e)
        })?;

        let conn = ConnectionManager::new(client).await.map_err(|e| {
            AppError::with_source(ErrorKind::Cache, "Failed to connect to Redis", e)
        })?;

        Ok(Self {
            conn,
            key_prefix: config.key_prefix.clone(),
        })
    }

    /// A clone of the connection manager for issuing commands.
    pub fn conn_mut(&self) -> ConnectionManager {
        self.conn.clone()
    }

    /// Build a full key with the configured prefix.
    pub fn prefixed_key(&self, key: &str) -> String {
        format!("{}{key}", self.key_prefix)
    }
}

/// Mask the password in a Redis URL for logging.
pub(crate) fn mask_redis_url(url: &str) -> String {
    let scheme_end = url.find("://").map(|p| p + 3).unwrap_or(0);
    if let Some(at_pos) = url.rfind('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            if colon_pos > scheme_end {
                return format!("{}:****@{}", &url[..colon_pos], &url[at_pos + 1..]);
            }
        }
    }
    url.to_string()
}
