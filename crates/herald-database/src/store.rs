//! Storage contracts used by the dispatcher and the scheduler.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use herald_core::result::AppResult;
use herald_core::types::{NotificationId, UserId};
use herald_entity::{ChannelKind, DeliveryAttempt, Notification, NotificationStatus};

/// A failed `(notification, channel)` pair selected for another attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryCandidate {
    /// The parent notification.
    pub notification: Notification,
    /// The channel whose last attempt failed.
    pub channel: ChannelKind,
}

/// Persistence of notifications and their delivery attempts.
#[async_trait]
pub trait NotificationStore: Send + Sync + std::fmt::Debug + 'static {
    /// Persist a new notification. Fails when the id is already taken.
    async fn insert(&self, notification: &Notification) -> AppResult<()>;

    /// Load a notification by ID.
    async fn find_by_id(&self, id: NotificationId) -> AppResult<Option<Notification>>;

    /// Move a notification to `status` if its current status allows it
    /// (see [`NotificationStatus::can_transition_to`]).
    ///
    /// Returns `false` when the transition was refused or the notification
    /// does not exist.
    async fn update_status(
        &self,
        id: NotificationId,
        status: NotificationStatus,
        now: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Atomically move a notification from `pending` to `processing`.
    ///
    /// Returns `false` when another worker already claimed it.
    async fn claim_pending(&self, id: NotificationId, now: DateTime<Utc>) -> AppResult<bool>;

    /// Pending notifications whose `scheduled_at` has passed, highest
    /// priority first, then earliest scheduled time.
    async fn find_due(&self, now: DateTime<Utc>, limit: u32) -> AppResult<Vec<Notification>>;

    /// Insert or replace the current attempt for `(notification, channel)`.
    async fn upsert_attempt(&self, attempt: &DeliveryAttempt) -> AppResult<()>;

    /// Current attempts of a notification.
    async fn attempts_for(&self, id: NotificationId) -> AppResult<Vec<DeliveryAttempt>>;

    /// Failed attempts older than `cooldown` belonging to retryable
    /// notifications younger than `window`, highest priority first, then
    /// oldest notification first.
    async fn find_retry_candidates(
        &self,
        now: DateTime<Utc>,
        cooldown: Duration,
        window: Duration,
        limit: u32,
    ) -> AppResult<Vec<RetryCandidate>>;
}

/// Upstream source of per-user channel preferences.
#[async_trait]
pub trait PreferenceSource: Send + Sync + std::fmt::Debug + 'static {
    /// The raw channel map of a user, or `None` if the user has none stored.
    async fn get_preferences(&self, user_id: UserId) -> AppResult<Option<BTreeMap<String, bool>>>;
}
