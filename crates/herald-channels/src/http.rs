//! Gateway sender that posts notifications as JSON over HTTP.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use herald_core::config::ChannelGatewayConfig;
use herald_core::error::{AppError, ErrorKind};
use herald_core::result::AppResult;
use herald_core::types::{NotificationId, UserId};
use herald_entity::{ChannelKind, Notification, NotificationPriority};

use crate::sender::{ChannelSender, SendError};

/// Consecutive transport failures after which the gateway is probed
/// before being reported available again.
const UNHEALTHY_AFTER: u32 = 3;

/// Body posted to a gateway.
#[derive(Debug, Serialize)]
struct GatewayRequest<'a> {
    notification_id: NotificationId,
    user_id: UserId,
    channel: ChannelKind,
    #[serde(rename = "type")]
    notification_type: &'a str,
    title: &'a str,
    message: &'a str,
    priority: NotificationPriority,
    metadata: &'a serde_json::Value,
    sent_at: DateTime<Utc>,
}

/// A push, SMS or email provider reached through an HTTP gateway.
#[derive(Debug)]
pub struct HttpChannelSender {
    kind: ChannelKind,
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    timeout_seconds: u64,
    consecutive_failures: AtomicU32,
}

impl HttpChannelSender {
    /// Build a sender for one channel from its gateway settings.
    pub fn new(kind: ChannelKind, config: &ChannelGatewayConfig) -> AppResult<Self> {
        if config.endpoint.trim().is_empty() {
            return Err(AppError::configuration(format!(
                "Channel '{kind}' is enabled but has no endpoint"
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Configuration,
                    format!("Failed to build HTTP client for '{kind}'"),
                    e,
                )
            })?;

        Ok(Self {
            kind,
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            timeout_seconds: config.timeout_seconds,
            consecutive_failures: AtomicU32::new(0),
        })
    }

    fn record_transport_failure(&self) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
        if failures == UNHEALTHY_AFTER {
            warn!(channel = %self.kind, failures, "Gateway marked unhealthy");
        }
    }

    fn map_request_error(&self, err: reqwest::Error) -> SendError {
        self.record_transport_failure();
        if err.is_timeout() {
            SendError::Timeout(self.timeout_seconds)
        } else {
            SendError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl ChannelSender for HttpChannelSender {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    async fn send(&self, notification: &Notification) -> Result<(), SendError> {
        let body = GatewayRequest {
            notification_id: notification.id,
            user_id: notification.user_id,
            channel: self.kind,
            notification_type: &notification.notification_type,
            title: &notification.title,
            message: &notification.message,
            priority: notification.priority,
            metadata: &notification.metadata,
            sent_at: Utc::now(),
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status();
        if status.is_success() {
            self.consecutive_failures.store(0, Ordering::SeqCst);
            debug!(channel = %self.kind, notification_id = %notification.id, "Gateway accepted");
            return Ok(());
        }

        let detail = response.text().await.unwrap_or_default();
        if status.is_client_error() {
            // The gateway is up; the message itself was refused.
            self.consecutive_failures.store(0, Ordering::SeqCst);
            Err(SendError::Rejected(format!("{status}: {detail}")))
        } else {
            self.record_transport_failure();
            Err(SendError::Transport(format!("{status}: {detail}")))
        }
    }

    async fn is_available(&self) -> bool {
        if self.consecutive_failures.load(Ordering::SeqCst) < UNHEALTHY_AFTER {
            return true;
        }
        // Any HTTP answer means the gateway is reachable again.
        match self.client.head(&self.endpoint).send().await {
            Ok(_) => {
                self.consecutive_failures.store(0, Ordering::SeqCst);
                true
            }
            Err(_) => false,
        }
    }
}
