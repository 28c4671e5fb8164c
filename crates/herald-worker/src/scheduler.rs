//! Periodic sweeps: deferred promotion and failed-delivery retry.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time;

use herald_core::config::SchedulerConfig;
use herald_core::result::AppResult;
use herald_database::NotificationStore;
use herald_engine::{Dispatcher, RetryOutcome};
use herald_entity::NotificationStatus;

/// Counters for one sweep iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Rows returned by the sweep query.
    pub selected: usize,
    /// Notifications promoted or channels re-sent.
    pub handled: usize,
    /// Rows left alone (already claimed, channel down, resolved meanwhile).
    pub skipped: usize,
    /// Rows whose handling hit an error.
    pub errors: usize,
}

/// Drives the two periodic sweeps over the notification store.
#[derive(Debug)]
pub struct Scheduler {
    store: Arc<dyn NotificationStore>,
    dispatcher: Arc<Dispatcher>,
    config: SchedulerConfig,
}

impl Scheduler {
    /// Create a new scheduler
    pub fn new(
        store: Arc<dyn NotificationStore>,
        dispatcher: Arc<Dispatcher>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            store,
            dispatcher,
            config,
        }
    }

    /// Promote every due deferred notification, as of `now`.
    ///
    /// Each notification is claimed (`pending → processing`) before being
    /// handed to the dispatcher, so an overlapping sweep cannot pick it up
    /// twice. A failing store query aborts the whole sweep.
    pub async fn run_promotion_sweep_at(&self, now: DateTime<Utc>) -> AppResult<SweepReport> {
        let due = self
            .store
            .find_due(now, self.config.promotion_batch_size)
            .await?;
        let mut report = SweepReport {
            selected: due.len(),
            ..SweepReport::default()
        };

        for mut notification in due {
            match self.store.claim_pending(notification.id, now).await {
                Ok(true) => {}
                Ok(false) => {
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    tracing::error!(
                        notification_id = %notification.id,
                        error = %e,
                        "Failed to claim notification"
                    );
                    report.errors += 1;
                    continue;
                }
            }

            notification.status = NotificationStatus::Processing;
            let id = notification.id;
            match self.dispatcher.process_claimed(notification).await {
                Ok(outcome) => {
                    tracing::debug!(
                        notification_id = %id,
                        status = %outcome.status,
                        "Promoted notification"
                    );
                    report.handled += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        notification_id = %id,
                        error = %e,
                        "Promoted notification not delivered"
                    );
                    report.errors += 1;
                }
            }
        }

        Ok(report)
    }

    /// Re-send every eligible failed channel, as of `now`.
    pub async fn run_retry_sweep_at(&self, now: DateTime<Utc>) -> AppResult<SweepReport> {
        let candidates = self
            .store
            .find_retry_candidates(
                now,
                self.config.retry_cooldown(),
                self.config.retry_window(),
                self.config.retry_batch_size,
            )
            .await?;
        let mut report = SweepReport {
            selected: candidates.len(),
            ..SweepReport::default()
        };

        for candidate in &candidates {
            match self.dispatcher.retry(candidate).await {
                Ok(RetryOutcome::Retried { attempt, status }) => {
                    tracing::info!(
                        notification_id = %candidate.notification.id,
                        channel = %candidate.channel,
                        attempt_status = %attempt.status,
                        status = %status,
                        "Retried channel"
                    );
                    report.handled += 1;
                }
                Ok(RetryOutcome::ChannelUnavailable | RetryOutcome::NoLongerRetryable) => {
                    report.skipped += 1;
                }
                Err(e) => {
                    tracing::error!(
                        notification_id = %candidate.notification.id,
                        channel = %candidate.channel,
                        error = %e,
                        "Retry failed"
                    );
                    report.errors += 1;
                }
            }
        }

        Ok(report)
    }

    /// Run the promotion sweep every `promotion_interval` until cancelled.
    pub async fn run_promotion(&self, cancel: watch::Receiver<bool>) {
        let interval = self.config.promotion_interval();
        tracing::info!(interval_secs = interval.as_secs(), "Promotion sweep started");
        run_every(interval, cancel, "promotion", move || async move {
            self.run_promotion_sweep_at(Utc::now()).await
        })
        .await;
    }

    /// Run the retry sweep every `retry_interval` until cancelled.
    pub async fn run_retry(&self, cancel: watch::Receiver<bool>) {
        let interval = self.config.retry_interval();
        tracing::info!(interval_secs = interval.as_secs(), "Retry sweep started");
        run_every(interval, cancel, "retry", move || async move {
            self.run_retry_sweep_at(Utc::now()).await
        })
        .await;
    }
}

/// Sleep `interval`, run `sweep`, repeat. A sweep error is logged and the
/// loop waits for the next tick. A running sweep is always completed.
async fn run_every<F, Fut>(
    interval: Duration,
    mut cancel: watch::Receiver<bool>,
    name: &str,
    mut sweep: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<SweepReport>>,
{
    loop {
        tokio::select! {
            changed = cancel.changed() => {
                if changed.is_err() || *cancel.borrow() {
                    break;
                }
            }
            _ = time::sleep(interval) => {
                match sweep().await {
                    Ok(report) if report.selected > 0 => {
                        tracing::info!(sweep = name, report = ?report, "Sweep finished");
                    }
                    Ok(_) => tracing::trace!(sweep = name, "Sweep found nothing"),
                    Err(e) => tracing::error!(sweep = name, error = %e, "Sweep skipped"),
                }
            }
        }
    }
    tracing::info!(sweep = name, "Sweep stopped");
}
