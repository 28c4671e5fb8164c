//! Notification dispatcher: persists, routes and fans out notifications.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tracing::{debug, error, info, warn};

use herald_channels::SendError;
use herald_core::error::AppError;
use herald_core::result::AppResult;
use herald_core::types::NotificationId;
use herald_database::{NotificationStore, RetryCandidate};
use herald_entity::{
    ChannelKind, DeliveryAttempt, Notification, NotificationRequest, NotificationStatus,
};

use crate::preferences::PreferenceResolver;
use crate::registry::ChannelRegistry;
use crate::routing::{FanOutMode, RoutePlan, Router, policy_for};
use crate::tracker::DeliveryTracker;

/// Result of submitting or processing one notification.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    /// The notification that was handled.
    pub notification_id: NotificationId,
    /// Its status after this call.
    pub status: NotificationStatus,
    /// Attempts made during this call, in completion order per mode.
    pub attempts: Vec<DeliveryAttempt>,
}

impl DispatchOutcome {
    /// Whether the notification was stored for later promotion.
    pub fn is_deferred(&self) -> bool {
        self.status == NotificationStatus::Pending
    }
}

/// Result of re-sending one failed channel.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryOutcome {
    /// The channel was attempted again.
    Retried {
        /// The new attempt.
        attempt: DeliveryAttempt,
        /// The recomputed notification status.
        status: NotificationStatus,
    },
    /// The channel is currently unavailable; the failed record is untouched.
    ChannelUnavailable,
    /// The notification is gone or no longer needs retries.
    NoLongerRetryable,
}

/// Orchestrates validation, persistence, routing, channel sends and
/// tracking for every notification.
#[derive(Debug)]
pub struct Dispatcher {
    store: Arc<dyn NotificationStore>,
    registry: Arc<ChannelRegistry>,
    preferences: Arc<PreferenceResolver>,
    tracker: DeliveryTracker,
    send_timeout: Duration,
}

impl Dispatcher {
    /// Creates a dispatcher. Every channel send is bounded by `send_timeout`.
    pub fn new(
        store: Arc<dyn NotificationStore>,
        registry: Arc<ChannelRegistry>,
        preferences: Arc<PreferenceResolver>,
        send_timeout: Duration,
    ) -> Self {
        Self {
            tracker: DeliveryTracker::new(Arc::clone(&store)),
            store,
            registry,
            preferences,
            send_timeout,
        }
    }

    /// The channel registry used for routing.
    pub fn registry(&self) -> &Arc<ChannelRegistry> {
        &self.registry
    }

    /// Validates and submits a raw request.
    ///
    /// Invalid requests are rejected with a `Validation` error before
    /// anything is persisted.
    pub async fn submit(&self, request: NotificationRequest) -> AppResult<DispatchOutcome> {
        let notification = request.into_notification(Utc::now())?;
        self.submit_notification(notification).await
    }

    /// Persists a validated notification as `pending`, then processes it
    /// unless it is scheduled for later.
    pub async fn submit_notification(
        &self,
        mut notification: Notification,
    ) -> AppResult<DispatchOutcome> {
        notification.status = NotificationStatus::Pending;
        self.store.insert(&notification).await?;

        if notification.is_deferred(Utc::now()) {
            info!(
                notification_id = %notification.id,
                scheduled_at = ?notification.scheduled_at,
                "Notification deferred"
            );
            return Ok(DispatchOutcome {
                notification_id: notification.id,
                status: NotificationStatus::Pending,
                attempts: Vec::new(),
            });
        }

        self.process(notification).await
    }

    /// Claims a stored `pending` notification and delivers it.
    ///
    /// The claim is the same atomic `pending → processing` step the
    /// promotion sweep takes, so a notification is only ever delivered by
    /// whoever wins it. A lost claim returns the current status without
    /// sending anything.
    pub async fn process(&self, mut notification: Notification) -> AppResult<DispatchOutcome> {
        if !self.store.claim_pending(notification.id, Utc::now()).await? {
            let status = self
                .store
                .find_by_id(notification.id)
                .await?
                .map_or(notification.status, |current| current.status);
            debug!(
                notification_id = %notification.id,
                status = %status,
                "Notification already claimed elsewhere"
            );
            return Ok(DispatchOutcome {
                notification_id: notification.id,
                status,
                attempts: Vec::new(),
            });
        }
        notification.status = NotificationStatus::Processing;
        self.process_claimed(notification).await
    }

    /// Delivers a notification that the caller already moved to
    /// `processing`.
    pub async fn process_claimed(&self, notification: Notification) -> AppResult<DispatchOutcome> {
        let policy = policy_for(notification.priority);
        let preferences = if policy.uses_preferences() {
            Some(self.preferences.resolve(notification.user_id).await)
        } else {
            None
        };

        let plan = match Router::plan(
            notification.priority,
            &notification.channels,
            preferences.as_ref(),
            |c| self.registry.is_available(c),
        ) {
            Ok(plan) => plan,
            Err(e) => {
                warn!(
                    notification_id = %notification.id,
                    priority = %notification.priority,
                    "No viable channel, marking failed"
                );
                self.finish(notification.id, NotificationStatus::Failed)
                    .await?;
                return Err(e);
            }
        };

        debug!(
            notification_id = %notification.id,
            mode = ?plan.mode,
            channels = ?plan.channels,
            fallback = ?plan.fallback,
            "Route planned"
        );

        let attempts = self.execute(&notification, &plan).await;
        let status = DeliveryTracker::summarize(plan.mode, &attempts);
        self.finish(notification.id, status).await?;

        info!(
            notification_id = %notification.id,
            status = %status,
            attempts = attempts.len(),
            "Notification processed"
        );

        Ok(DispatchOutcome {
            notification_id: notification.id,
            status,
            attempts,
        })
    }

    /// Re-sends a single failed channel and recomputes the notification
    /// status from all of its attempts.
    pub async fn retry(&self, candidate: &RetryCandidate) -> AppResult<RetryOutcome> {
        let Some(current) = self.store.find_by_id(candidate.notification.id).await? else {
            return Ok(RetryOutcome::NoLongerRetryable);
        };
        if !current.status.is_retryable() {
            return Ok(RetryOutcome::NoLongerRetryable);
        }
        if !self.registry.is_available(candidate.channel) {
            debug!(
                notification_id = %current.id,
                channel = %candidate.channel,
                "Retry skipped, channel unavailable"
            );
            return Ok(RetryOutcome::ChannelUnavailable);
        }

        let attempt = self.attempt(&current, candidate.channel).await;
        let status = self.tracker.recompute(&current, Utc::now()).await?;
        Ok(RetryOutcome::Retried { attempt, status })
    }

    /// Stores the end-of-cycle status of a notification this dispatcher
    /// holds in `processing`.
    async fn finish(&self, id: NotificationId, status: NotificationStatus) -> AppResult<()> {
        if self.store.update_status(id, status, Utc::now()).await? {
            return Ok(());
        }
        warn!(notification_id = %id, status = %status, "Status transition refused");
        Err(AppError::conflict(format!(
            "Notification {id} is no longer processing; refused move to {status}"
        )))
    }

    async fn execute(&self, notification: &Notification, plan: &RoutePlan) -> Vec<DeliveryAttempt> {
        match plan.mode {
            FanOutMode::BroadcastAll => {
                join_all(
                    plan.channels
                        .iter()
                        .map(|channel| self.attempt(notification, *channel)),
                )
                .await
            }
            FanOutMode::EachInOrder => {
                let mut attempts = Vec::with_capacity(plan.channels.len());
                for channel in &plan.channels {
                    attempts.push(self.attempt(notification, *channel).await);
                }
                attempts
            }
            FanOutMode::FirstSuccess => {
                let mut attempts = Vec::with_capacity(plan.channels.len() + 1);
                for channel in &plan.channels {
                    let attempt = self.attempt(notification, *channel).await;
                    let delivered = attempt.is_delivered();
                    attempts.push(attempt);
                    if delivered {
                        return attempts;
                    }
                }
                if let Some(fallback) = plan.fallback {
                    info!(
                        notification_id = %notification.id,
                        channel = %fallback,
                        "Primary channels exhausted, using fallback"
                    );
                    attempts.push(self.attempt(notification, fallback).await);
                }
                attempts
            }
        }
    }

    /// Sends on one channel within the send timeout and records the outcome.
    async fn attempt(&self, notification: &Notification, channel: ChannelKind) -> DeliveryAttempt {
        let result = match self.registry.sender(channel) {
            Some(sender) => {
                match tokio::time::timeout(self.send_timeout, sender.send(notification)).await {
                    Ok(result) => result,
                    Err(_) => Err(SendError::Timeout(self.send_timeout.as_secs())),
                }
            }
            None => Err(SendError::Unavailable),
        };

        let now = Utc::now();
        let attempt = match result {
            Ok(()) => {
                info!(notification_id = %notification.id, channel = %channel, "Delivered");
                DeliveryAttempt::delivered(notification.id, channel, now)
            }
            Err(e) => {
                warn!(
                    notification_id = %notification.id,
                    channel = %channel,
                    error = %e,
                    "Delivery failed"
                );
                DeliveryAttempt::failed(notification.id, channel, now, e.to_string())
            }
        };

        if let Err(e) = self.tracker.record(&attempt).await {
            error!(
                notification_id = %notification.id,
                channel = %channel,
                error = %e,
                "Failed to record delivery attempt"
            );
        }
        attempt
    }
}
