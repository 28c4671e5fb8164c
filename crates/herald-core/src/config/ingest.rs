//! Upstream event bus configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Ingest loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Event source type: `"memory"` or `"redis"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Topics consumed by the ingest loop.
    #[serde(default = "default_topics")]
    pub topics: Vec<String>,
    /// Maximum seconds a single poll waits for messages.
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_seconds: u64,
    /// Maximum messages taken per poll.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Redis URL used by the `redis` provider.
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
}

impl IngestConfig {
    /// The poll timeout as a [`Duration`].
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_seconds)
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            topics: default_topics(),
            poll_timeout_seconds: default_poll_timeout(),
            batch_size: default_batch_size(),
            redis_url: default_redis_url(),
        }
    }
}

fn default_provider() -> String {
    "memory".to_string()
}

fn default_topics() -> Vec<String> {
    vec![
        "user-notifications".to_string(),
        "system-alerts".to_string(),
        "emergency-alerts".to_string(),
    ]
}

fn default_poll_timeout() -> u64 {
    5
}

fn default_batch_size() -> usize {
    100
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}
