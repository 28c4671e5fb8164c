//! Notification entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use herald_core::types::{NotificationId, UserId};

use super::priority::NotificationPriority;
use super::status::NotificationStatus;

/// The unit of work handled by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Notification {
    /// Unique notification identifier.
    pub id: NotificationId,
    /// The recipient user.
    pub user_id: UserId,
    /// Free-form type tag (e.g. `device_alert`).
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub notification_type: String,
    /// Notification title.
    pub title: String,
    /// Notification body text.
    pub message: String,
    /// Priority tier driving the routing policy.
    pub priority: NotificationPriority,
    /// Ordered channel hint; empty means "use preferences".
    pub channels: Vec<String>,
    /// Deferred delivery time; `None` means deliver now.
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Summary delivery status.
    pub status: NotificationStatus,
    /// Additional structured data (JSON).
    pub metadata: serde_json::Value,
    /// When the notification was created.
    pub created_at: DateTime<Utc>,
    /// When the notification was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Notification {
    /// Whether the notification must wait for the promotion sweep.
    pub fn is_deferred(&self, now: DateTime<Utc>) -> bool {
        self.scheduled_at.is_some_and(|at| at > now)
    }

    /// Whether failed deliveries of this notification may still be retried.
    ///
    /// Older records are frozen for audit.
    pub fn is_within_retry_window(&self, now: DateTime<Utc>, window: chrono::Duration) -> bool {
        self.created_at > now - window
    }
}
