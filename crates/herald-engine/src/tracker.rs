//! Delivery attempt bookkeeping and status summaries.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use herald_core::error::AppError;
use herald_core::result::AppResult;
use herald_database::NotificationStore;
use herald_entity::{DeliveryAttempt, Notification, NotificationStatus};

use crate::routing::{FanOutMode, policy_for};

/// Records per-channel outcomes and derives the notification status from
/// them.
#[derive(Debug, Clone)]
pub struct DeliveryTracker {
    store: Arc<dyn NotificationStore>,
}

impl DeliveryTracker {
    /// Creates a tracker writing to `store`.
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self { store }
    }

    /// Upserts the current attempt for its `(notification, channel)` pair.
    pub async fn record(&self, attempt: &DeliveryAttempt) -> AppResult<()> {
        self.store.upsert_attempt(attempt).await
    }

    /// Current attempts of a notification.
    pub async fn attempts(&self, notification: &Notification) -> AppResult<Vec<DeliveryAttempt>> {
        self.store.attempts_for(notification.id).await
    }

    /// Recomputes and stores the status of a notification from all of its
    /// current attempts.
    ///
    /// Fails with `Conflict` when the stored status no longer accepts the
    /// summary (for example a concurrent cycle already resolved it).
    pub async fn recompute(
        &self,
        notification: &Notification,
        now: DateTime<Utc>,
    ) -> AppResult<NotificationStatus> {
        let attempts = self.attempts(notification).await?;
        let status = Self::summarize(policy_for(notification.priority).mode, &attempts);
        if !self.store.update_status(notification.id, status, now).await? {
            return Err(AppError::conflict(format!(
                "Notification {} refused status {status}",
                notification.id
            )));
        }
        Ok(status)
    }

    /// Status implied by a set of attempts under a fan-out mode.
    ///
    /// With `FirstSuccess` a single delivery satisfies the notification;
    /// the other modes want every attempted channel to deliver.
    pub fn summarize(mode: FanOutMode, attempts: &[DeliveryAttempt]) -> NotificationStatus {
        let delivered = attempts.iter().filter(|a| a.is_delivered()).count();
        match (mode, delivered) {
            (_, 0) => NotificationStatus::Failed,
            (FanOutMode::FirstSuccess, _) => NotificationStatus::Delivered,
            (_, n) if n == attempts.len() => NotificationStatus::Delivered,
            _ => NotificationStatus::PartiallyDelivered,
        }
    }
}
