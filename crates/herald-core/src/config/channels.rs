//! Channel gateway configuration.

use serde::{Deserialize, Serialize};

/// Gateway settings for every delivery channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelsConfig {
    /// Push notification gateway.
    #[serde(default)]
    pub push: ChannelGatewayConfig,
    /// SMS gateway.
    #[serde(default)]
    pub sms: ChannelGatewayConfig,
    /// Email service.
    #[serde(default)]
    pub email: ChannelGatewayConfig,
}

/// Connection settings for a single provider gateway.
///
/// A channel whose gateway is disabled is never registered and is
/// therefore treated as unavailable by the router.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelGatewayConfig {
    /// Whether this channel is registered at all.
    #[serde(default)]
    pub enabled: bool,
    /// Gateway endpoint that accepts a JSON delivery request.
    #[serde(default)]
    pub endpoint: String,
    /// Optional bearer token sent to the gateway.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ChannelGatewayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: String::new(),
            api_key: None,
            timeout_seconds: default_timeout(),
        }
    }
}

/// Channel health monitoring configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Interval in seconds between availability probes.
    #[serde(default = "default_check_interval")]
    pub channel_check_interval_seconds: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            channel_check_interval_seconds: default_check_interval(),
        }
    }
}

fn default_timeout() -> u64 {
    10
}

fn default_check_interval() -> u64 {
    30
}
