//! Dispatcher configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Dispatcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Upper bound in seconds for a single channel send.
    #[serde(default = "default_send_timeout")]
    pub send_timeout_seconds: u64,
}

impl DispatchConfig {
    /// The send timeout as a [`Duration`].
    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_seconds)
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            send_timeout_seconds: default_send_timeout(),
        }
    }
}

fn default_send_timeout() -> u64 {
    15
}
