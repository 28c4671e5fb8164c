//! Delivery attempt entity.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use herald_core::types::NotificationId;

use crate::channel::ChannelKind;

/// Outcome of one channel send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "delivery_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// The channel accepted the notification.
    Delivered,
    /// The channel rejected the notification or timed out.
    Failed,
}

impl DeliveryStatus {
    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Current delivery record for a `(notification, channel)` pair.
///
/// A newer attempt replaces the previous record for the same pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DeliveryAttempt {
    /// The notification this attempt belongs to.
    pub notification_id: NotificationId,
    /// Channel that was attempted.
    pub channel: ChannelKind,
    /// Outcome of the most recent attempt.
    pub status: DeliveryStatus,
    /// When the most recent attempt finished.
    pub attempted_at: DateTime<Utc>,
    /// Failure reason of the most recent attempt, if it failed.
    pub last_error: Option<String>,
}

impl DeliveryAttempt {
    /// A successful attempt.
    pub fn delivered(
        notification_id: NotificationId,
        channel: ChannelKind,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            notification_id,
            channel,
            status: DeliveryStatus::Delivered,
            attempted_at: at,
            last_error: None,
        }
    }

    /// A failed attempt.
    pub fn failed(
        notification_id: NotificationId,
        channel: ChannelKind,
        at: DateTime<Utc>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            notification_id,
            channel,
            status: DeliveryStatus::Failed,
            attempted_at: at,
            last_error: Some(error.into()),
        }
    }

    /// Whether the channel accepted the notification.
    pub fn is_delivered(&self) -> bool {
        self.status == DeliveryStatus::Delivered
    }
}
