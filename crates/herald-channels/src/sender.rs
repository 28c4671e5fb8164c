//! The delivery channel contract.

use async_trait::async_trait;
use thiserror::Error;

use herald_core::error::{AppError, ErrorKind};
use herald_entity::{ChannelKind, Notification};

/// Why a single channel send failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SendError {
    /// The provider refused the message.
    #[error("rejected by provider: {0}")]
    Rejected(String),
    /// No answer within the send timeout.
    #[error("timed out after {0}s")]
    Timeout(u64),
    /// Network or provider-side failure.
    #[error("transport error: {0}")]
    Transport(String),
    /// The channel is switched off or unreachable.
    #[error("channel unavailable")]
    Unavailable,
}

impl From<SendError> for AppError {
    fn from(err: SendError) -> Self {
        AppError::with_source(ErrorKind::Delivery, err.to_string(), err)
    }
}

/// A single delivery channel.
///
/// Implementations must be safe to call concurrently: emergency fan-out
/// sends on every channel at once.
#[async_trait]
pub trait ChannelSender: Send + Sync + std::fmt::Debug + 'static {
    /// Which channel this sender delivers on.
    fn kind(&self) -> ChannelKind;

    /// Deliver one notification.
    async fn send(&self, notification: &Notification) -> Result<(), SendError>;

    /// Whether the channel is currently able to accept messages.
    async fn is_available(&self) -> bool;
}
