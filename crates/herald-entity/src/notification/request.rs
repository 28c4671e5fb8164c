//! Inbound notification request as it arrives on the event bus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use herald_core::error::AppError;
use herald_core::types::{NotificationId, UserId};

use super::model::Notification;
use super::priority::NotificationPriority;
use super::status::NotificationStatus;

/// Wire shape of a notification request.
///
/// Required fields default to empty strings so that a missing field is
/// reported as a validation error rather than a decode failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct NotificationRequest {
    /// Optional caller-assigned identifier.
    #[serde(default)]
    pub id: Option<Uuid>,
    /// Recipient user ID.
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "user_id is required"))]
    pub user_id: String,
    /// Type tag.
    #[serde(default, rename = "type")]
    #[validate(custom(function = "not_blank", message = "type is required"))]
    pub notification_type: String,
    /// Title.
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "title is required"))]
    pub title: String,
    /// Body text.
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "message is required"))]
    pub message: String,
    /// One of `emergency`, `high`, `normal`.
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "priority is required"))]
    pub priority: String,
    /// Ordered channel hint.
    #[serde(default)]
    pub channels: Vec<String>,
    /// Deferred delivery time.
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl NotificationRequest {
    /// Validate the request and build a `pending` notification.
    pub fn into_notification(self, now: DateTime<Utc>) -> Result<Notification, AppError> {
        self.validate()
            .map_err(|e| AppError::validation(format!("Invalid notification: {e}")))?;

        let user_id: UserId = self
            .user_id
            .trim()
            .parse()
            .map_err(|_| AppError::validation(format!("user_id '{}' is not a UUID", self.user_id)))?;
        let priority: NotificationPriority = self.priority.parse()?;

        Ok(Notification {
            id: self.id.map(NotificationId::from).unwrap_or_default(),
            user_id,
            notification_type: self.notification_type,
            title: self.title,
            message: self.message,
            priority,
            channels: self.channels,
            scheduled_at: self.scheduled_at,
            status: NotificationStatus::Pending,
            metadata: self
                .metadata
                .unwrap_or_else(|| serde_json::Value::Object(Default::default())),
            created_at: now,
            updated_at: now,
        })
    }
}

impl From<&Notification> for NotificationRequest {
    fn from(n: &Notification) -> Self {
        Self {
            id: Some(n.id.into_uuid()),
            user_id: n.user_id.to_string(),
            notification_type: n.notification_type.clone(),
            title: n.title.clone(),
            message: n.message.clone(),
            priority: n.priority.to_string(),
            channels: n.channels.clone(),
            scheduled_at: n.scheduled_at,
            metadata: Some(n.metadata.clone()),
        }
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}
