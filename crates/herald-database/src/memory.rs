//! In-memory store and preference source.
//!
//! Used for single-node development setups and throughout the test suite.
//! Attempts live in a [`DashMap`] keyed by `(notification, channel)` so
//! concurrent upserts for different channels of one notification never
//! contend on a shared lock.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tokio::sync::RwLock;

use herald_core::error::AppError;
use herald_core::result::AppResult;
use herald_core::types::{NotificationId, UserId};
use herald_entity::{
    ChannelKind, DeliveryAttempt, DeliveryStatus, Notification, NotificationStatus,
};

use crate::store::{NotificationStore, PreferenceSource, RetryCandidate};

/// Process-local [`NotificationStore`].
#[derive(Debug, Default)]
pub struct MemoryNotificationStore {
    notifications: RwLock<HashMap<NotificationId, Notification>>,
    attempts: DashMap<(NotificationId, ChannelKind), DeliveryAttempt>,
}

impl MemoryNotificationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored notifications.
    pub async fn len(&self) -> usize {
        self.notifications.read().await.len()
    }

    /// Whether the store holds no notifications.
    pub async fn is_empty(&self) -> bool {
        self.notifications.read().await.is_empty()
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn insert(&self, notification: &Notification) -> AppResult<()> {
        match self.notifications.write().await.entry(notification.id) {
            Entry::Occupied(_) => Err(AppError::database(format!(
                "Notification {} already exists",
                notification.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(notification.clone());
                Ok(())
            }
        }
    }

    async fn find_by_id(&self, id: NotificationId) -> AppResult<Option<Notification>> {
        Ok(self.notifications.read().await.get(&id).cloned())
    }

    async fn update_status(
        &self,
        id: NotificationId,
        status: NotificationStatus,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        match self.notifications.write().await.get_mut(&id) {
            Some(n) if n.status.can_transition_to(status) => {
                n.status = status;
                n.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn claim_pending(&self, id: NotificationId, now: DateTime<Utc>) -> AppResult<bool> {
        let mut guard = self.notifications.write().await;
        match guard.get_mut(&id) {
            Some(n) if n.status == NotificationStatus::Pending => {
                n.status = NotificationStatus::Processing;
                n.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_due(&self, now: DateTime<Utc>, limit: u32) -> AppResult<Vec<Notification>> {
        let guard = self.notifications.read().await;
        let mut due: Vec<Notification> = guard
            .values()
            .filter(|n| n.status == NotificationStatus::Pending)
            .filter(|n| n.scheduled_at.is_some_and(|at| at <= now))
            .cloned()
            .collect();
        due.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.scheduled_at.cmp(&b.scheduled_at))
        });
        due.truncate(limit as usize);
        Ok(due)
    }

    async fn upsert_attempt(&self, attempt: &DeliveryAttempt) -> AppResult<()> {
        self.attempts
            .insert((attempt.notification_id, attempt.channel), attempt.clone());
        Ok(())
    }

    async fn attempts_for(&self, id: NotificationId) -> AppResult<Vec<DeliveryAttempt>> {
        let mut attempts: Vec<DeliveryAttempt> = self
            .attempts
            .iter()
            .filter(|entry| entry.key().0 == id)
            .map(|entry| entry.value().clone())
            .collect();
        attempts.sort_by_key(|a| a.channel);
        Ok(attempts)
    }

    async fn find_retry_candidates(
        &self,
        now: DateTime<Utc>,
        cooldown: Duration,
        window: Duration,
        limit: u32,
    ) -> AppResult<Vec<RetryCandidate>> {
        let failed: Vec<DeliveryAttempt> = self
            .attempts
            .iter()
            .filter(|entry| {
                let a = entry.value();
                a.status == DeliveryStatus::Failed && a.attempted_at < now - cooldown
            })
            .map(|entry| entry.value().clone())
            .collect();

        let guard = self.notifications.read().await;
        let mut candidates: Vec<RetryCandidate> = failed
            .into_iter()
            .filter_map(|a| {
                let n = guard.get(&a.notification_id)?;
                (n.status.is_retryable() && n.is_within_retry_window(now, window)).then(|| {
                    RetryCandidate {
                        notification: n.clone(),
                        channel: a.channel,
                    }
                })
            })
            .collect();
        candidates.sort_by(|a, b| {
            b.notification
                .priority
                .cmp(&a.notification.priority)
                .then_with(|| a.notification.created_at.cmp(&b.notification.created_at))
                .then_with(|| a.channel.cmp(&b.channel))
        });
        candidates.truncate(limit as usize);
        Ok(candidates)
    }
}

/// Process-local [`PreferenceSource`].
#[derive(Debug, Default)]
pub struct MemoryPreferenceSource {
    preferences: DashMap<UserId, BTreeMap<String, bool>>,
    fetches: AtomicUsize,
}

impl MemoryPreferenceSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the channel map of a user.
    pub fn set(&self, user_id: UserId, channels: &[(&str, bool)]) {
        let map = channels
            .iter()
            .map(|(name, enabled)| (name.to_string(), *enabled))
            .collect();
        self.preferences.insert(user_id, map);
    }

    /// How many lookups reached this source.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PreferenceSource for MemoryPreferenceSource {
    async fn get_preferences(&self, user_id: UserId) -> AppResult<Option<BTreeMap<String, bool>>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.preferences.get(&user_id).map(|entry| entry.clone()))
    }
}
