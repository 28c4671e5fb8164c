//! Upstream event bus contract.

use std::time::Duration;

use async_trait::async_trait;

use crate::result::AppResult;

/// A serialized message pulled from a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    /// Topic the message was consumed from.
    pub topic: String,
    /// Raw message body.
    pub payload: Vec<u8>,
}

impl RawEvent {
    /// Create an event for a topic.
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Pull-based consumer over one or more logical topics.
///
/// Ordering across topics is not guaranteed. A call returns as soon as at
/// least one message is available, or an empty batch once `timeout` elapses.
#[async_trait]
pub trait EventSource: Send + Sync + std::fmt::Debug + 'static {
    /// Take up to `max` messages from any of `topics`.
    async fn poll(
        &self,
        topics: &[String],
        max: usize,
        timeout: Duration,
    ) -> AppResult<Vec<RawEvent>>;
}
