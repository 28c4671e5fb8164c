//! Event bus consumer feeding the dispatcher.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::watch;

use herald_core::config::IngestConfig;
use herald_core::error::{AppError, ErrorKind};
use herald_core::result::AppResult;
use herald_core::traits::{EventSource, RawEvent};
use herald_engine::{DispatchOutcome, Dispatcher};
use herald_entity::NotificationRequest;

/// Pulls raw notification requests off the bus and submits them.
///
/// Malformed or invalid messages are logged and dropped; nothing is ever
/// put back on the bus.
#[derive(Debug)]
pub struct IngestLoop {
    source: Arc<dyn EventSource>,
    dispatcher: Arc<Dispatcher>,
    config: IngestConfig,
}

impl IngestLoop {
    /// Create a new ingest loop
    pub fn new(
        source: Arc<dyn EventSource>,
        dispatcher: Arc<Dispatcher>,
        config: IngestConfig,
    ) -> Self {
        Self {
            source,
            dispatcher,
            config,
        }
    }

    /// Consume until the cancel signal is received. The signal is checked
    /// between polls; a poll in flight is bounded by `poll_timeout` and the
    /// batch it returns is finished before stopping.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        tracing::info!(
            topics = ?self.config.topics,
            batch_size = self.config.batch_size,
            "Ingest started"
        );

        loop {
            if *cancel.borrow() {
                break;
            }

            match self.poll_once().await {
                Ok(events) => {
                    if !events.is_empty() {
                        self.handle_batch(&events).await;
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Event poll failed");
                    // Avoid spinning on a broken bus.
                    tokio::select! {
                        changed = cancel.changed() => {
                            if changed.is_err() {
                                break;
                            }
                        }
                        _ = tokio::time::sleep(self.config.poll_timeout()) => {}
                    }
                }
            }
        }

        tracing::info!("Ingest stopped");
    }

    /// One bounded poll of all configured topics.
    pub async fn poll_once(&self) -> AppResult<Vec<RawEvent>> {
        self.source
            .poll(
                &self.config.topics,
                self.config.batch_size,
                self.config.poll_timeout(),
            )
            .await
    }

    /// Submit every event of a batch concurrently. Returns how many were
    /// accepted by the dispatcher.
    pub async fn handle_batch(&self, events: &[RawEvent]) -> usize {
        join_all(events.iter().map(|event| self.handle_event(event)))
            .await
            .into_iter()
            .filter(Result::is_ok)
            .count()
    }

    /// Decode, validate and submit a single event.
    pub async fn handle_event(&self, event: &RawEvent) -> AppResult<DispatchOutcome> {
        let request = decode(event).inspect_err(|e| {
            tracing::error!(topic = %event.topic, error = %e, "Dropping malformed message");
        })?;

        match self.dispatcher.submit(request).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                match e.kind {
                    ErrorKind::Validation => {
                        tracing::error!(topic = %event.topic, error = %e, "Dropping invalid message")
                    }
                    ErrorKind::NoViableChannel => {
                        tracing::warn!(topic = %event.topic, error = %e, "Message had no viable channel")
                    }
                    _ => tracing::error!(topic = %event.topic, error = %e, "Failed to submit message"),
                }
                Err(e)
            }
        }
    }
}

fn decode(event: &RawEvent) -> AppResult<NotificationRequest> {
    serde_json::from_slice(&event.payload).map_err(|e| {
        AppError::with_source(
            ErrorKind::Validation,
            format!("Undecodable notification payload: {e}"),
            e,
        )
    })
}
