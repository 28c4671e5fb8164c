//! Promotion and retry sweep configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Scheduler sweep configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Interval in seconds between deferred-promotion sweeps.
    #[serde(default = "default_promotion_interval")]
    pub promotion_interval_seconds: u64,
    /// Interval in seconds between retry sweeps.
    #[serde(default = "default_retry_interval")]
    pub retry_interval_seconds: u64,
    /// Maximum notifications promoted per sweep.
    #[serde(default = "default_promotion_batch")]
    pub promotion_batch_size: u32,
    /// Maximum failed attempts retried per sweep.
    #[serde(default = "default_retry_batch")]
    pub retry_batch_size: u32,
    /// Minimum age in seconds of a failed attempt before it is retried.
    #[serde(default = "default_retry_cooldown")]
    pub retry_cooldown_seconds: u64,
    /// Maximum notification age in hours for which failures are retried.
    #[serde(default = "default_retry_window")]
    pub retry_window_hours: u64,
    /// Seconds to wait for in-flight work during shutdown.
    #[serde(default = "default_drain_timeout")]
    pub drain_timeout_seconds: u64,
}

impl SchedulerConfig {
    /// Interval between promotion sweeps.
    pub fn promotion_interval(&self) -> Duration {
        Duration::from_secs(self.promotion_interval_seconds)
    }

    /// Interval between retry sweeps.
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_seconds)
    }

    /// Cooldown before a failed attempt is eligible again.
    pub fn retry_cooldown(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.retry_cooldown_seconds as i64)
    }

    /// Retry-eligibility window measured from notification creation.
    pub fn retry_window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.retry_window_hours as i64)
    }

    /// Shutdown drain period.
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_seconds)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            promotion_interval_seconds: default_promotion_interval(),
            retry_interval_seconds: default_retry_interval(),
            promotion_batch_size: default_promotion_batch(),
            retry_batch_size: default_retry_batch(),
            retry_cooldown_seconds: default_retry_cooldown(),
            retry_window_hours: default_retry_window(),
            drain_timeout_seconds: default_drain_timeout(),
        }
    }
}

fn default_promotion_interval() -> u64 {
    60
}

fn default_retry_interval() -> u64 {
    300
}

fn default_promotion_batch() -> u32 {
    100
}

fn default_retry_batch() -> u32 {
    50
}

fn default_retry_cooldown() -> u64 {
    300
}

fn default_retry_window() -> u64 {
    24
}

fn default_drain_timeout() -> u64 {
    30
}
