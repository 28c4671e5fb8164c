//! Periodic channel availability probing.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;

use herald_engine::ChannelRegistry;

/// Upper bound on a single availability probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Writes each sender's `is_available()` answer into the registry.
#[derive(Debug)]
pub struct ChannelHealthMonitor {
    registry: Arc<ChannelRegistry>,
    interval: Duration,
}

impl ChannelHealthMonitor {
    /// Create a monitor probing every `interval`.
    pub fn new(registry: Arc<ChannelRegistry>, interval: Duration) -> Self {
        Self { registry, interval }
    }

    /// Probe every registered channel once. Returns how many flags changed.
    ///
    /// A probe that does not answer within a few seconds counts as
    /// unavailable.
    pub async fn check_once(&self) -> usize {
        let mut changed = 0;
        for sender in self.registry.senders() {
            let kind = sender.kind();
            let available = time::timeout(PROBE_TIMEOUT, sender.is_available())
                .await
                .unwrap_or(false);
            match self.registry.set_available(kind, available) {
                Some(previous) if previous != available => {
                    changed += 1;
                    if available {
                        tracing::info!("Channel '{}' is available again", kind);
                    } else {
                        tracing::warn!("Channel '{}' became unavailable", kind);
                    }
                }
                _ => {}
            }
        }
        changed
    }

    /// Probe every `interval` until cancelled.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        tracing::info!(
            "Channel health monitor started, interval={}s",
            self.interval.as_secs()
        );
        loop {
            tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        break;
                    }
                }
                _ = time::sleep(self.interval) => {
                    self.check_once().await;
                }
            }
        }
        tracing::info!("Channel health monitor stopped");
    }
}
