//! Event bus ingestion and the full background service.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::{Mutex, watch};

use herald_core::config::IngestConfig;
use herald_core::error::ErrorKind;
use herald_core::result::AppResult;
use herald_core::traits::{EventSource, RawEvent};
use herald_core::types::UserId;
use herald_entity::{ChannelKind, NotificationStatus};
use herald_worker::sources::memory::MemoryEventSource;
use herald_worker::{ChannelHealthMonitor, IngestLoop, ServiceRunner};

use crate::helpers::{MockSender, TestEngine};

fn ingest_config() -> IngestConfig {
    IngestConfig {
        provider: "memory".to_string(),
        topics: vec!["user-notifications".to_string(), "system-alerts".to_string()],
        poll_timeout_seconds: 1,
        ..IngestConfig::default()
    }
}

fn payload(user: UserId, priority: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "user_id": user.to_string(),
        "type": "maintenance",
        "title": "Planned maintenance",
        "message": "Gateway restarts at 02:00 UTC",
        "priority": priority,
    }))
    .unwrap()
}

#[tokio::test]
async fn test_batch_drops_malformed_and_invalid_messages() {
    let email = MockSender::ok(ChannelKind::Email);
    let engine = TestEngine::new(&[email.clone()]);
    let source = Arc::new(MemoryEventSource::new());
    let ingest = IngestLoop::new(source.clone(), Arc::clone(&engine.dispatcher), ingest_config());

    source
        .publish("user-notifications", payload(UserId::new(), "normal"))
        .await;
    source.publish("user-notifications", b"{broken".to_vec()).await;
    source
        .publish("system-alerts", payload(UserId::new(), "critical"))
        .await;

    let batch = ingest.poll_once().await.unwrap();
    assert_eq!(batch.len(), 3);
    assert_eq!(ingest.handle_batch(&batch).await, 1);
    assert_eq!(email.calls(), 1);

    // Nothing is re-queued.
    assert!(ingest.poll_once().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_handle_event_submits_request() {
    let push = MockSender::ok(ChannelKind::Push);
    let engine = TestEngine::new(&[push.clone()]);
    let ingest = IngestLoop::new(
        Arc::new(MemoryEventSource::new()),
        Arc::clone(&engine.dispatcher),
        ingest_config(),
    );

    let outcome = ingest
        .handle_event(&RawEvent::new(
            "system-alerts",
            payload(UserId::new(), "high"),
        ))
        .await
        .unwrap();

    assert_eq!(outcome.status, NotificationStatus::Delivered);
    assert_eq!(push.calls(), 1);
}

#[tokio::test]
async fn test_handle_event_reports_validation_errors() {
    let engine = TestEngine::new(&[MockSender::ok(ChannelKind::Email)]);
    let ingest = IngestLoop::new(
        Arc::new(MemoryEventSource::new()),
        Arc::clone(&engine.dispatcher),
        ingest_config(),
    );
    let body = serde_json::to_vec(&json!({
        "user_id": UserId::new().to_string(),
        "type": "maintenance",
        "title": "",
        "message": "m",
        "priority": "normal",
    }))
    .unwrap();

    let err = ingest
        .handle_event(&RawEvent::new("user-notifications", body))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_service_runner_processes_bus_and_drains() {
    let sms = MockSender::ok(ChannelKind::Sms);
    let engine = TestEngine::new(&[sms.clone()]);
    let source = Arc::new(MemoryEventSource::new());

    let ingest = Arc::new(IngestLoop::new(
        source.clone(),
        Arc::clone(&engine.dispatcher),
        ingest_config(),
    ));
    let scheduler = Arc::new(herald_worker::Scheduler::new(
        Arc::clone(&engine.store),
        Arc::clone(&engine.dispatcher),
        Default::default(),
    ));
    let health = Arc::new(ChannelHealthMonitor::new(
        Arc::clone(&engine.registry),
        Duration::from_secs(30),
    ));
    let runner = ServiceRunner::start(Duration::from_secs(5), ingest, scheduler, health);
    assert_eq!(runner.task_count(), 4);

    source
        .publish("system-alerts", payload(UserId::new(), "emergency"))
        .await;

    let delivered = tokio::time::timeout(Duration::from_secs(5), async {
        while sms.calls() == 0 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;

    assert!(runner.shutdown().await, "tasks did not drain");
    assert!(delivered.is_ok(), "message was never consumed");
    assert_eq!(sms.calls(), 1);
}

/// Hands out its queued batch once, raising the shutdown signal while the
/// poll is still in flight.
#[derive(Debug)]
struct CancelDuringPoll {
    cancel: watch::Sender<bool>,
    queued: Mutex<Vec<RawEvent>>,
}

#[async_trait]
impl EventSource for CancelDuringPoll {
    async fn poll(
        &self,
        _topics: &[String],
        _max: usize,
        _timeout: Duration,
    ) -> AppResult<Vec<RawEvent>> {
        let _ = self.cancel.send(true);
        tokio::task::yield_now().await;
        Ok(std::mem::take(&mut *self.queued.lock().await))
    }
}

#[tokio::test]
async fn test_batch_taken_while_cancelling_is_still_delivered() {
    let push = MockSender::ok(ChannelKind::Push);
    let engine = TestEngine::new(&[push.clone()]);
    let (tx, rx) = watch::channel(false);
    let source = Arc::new(CancelDuringPoll {
        cancel: tx,
        queued: Mutex::new(vec![RawEvent::new(
            "system-alerts",
            payload(UserId::new(), "emergency"),
        )]),
    });
    let ingest = IngestLoop::new(source.clone(), Arc::clone(&engine.dispatcher), ingest_config());

    tokio::time::timeout(Duration::from_secs(5), ingest.run(rx))
        .await
        .expect("ingest did not stop after cancel");

    assert_eq!(push.calls(), 1);
    assert!(source.queued.lock().await.is_empty());
}
