//! Deferred promotion and retry sweeps.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;

use herald_core::config::SchedulerConfig;
use herald_core::types::UserId;
use herald_entity::{ChannelKind, DeliveryStatus, NotificationStatus};
use herald_worker::Scheduler;

use crate::helpers::{FlakyStore, MockSender, TestEngine, request};

#[tokio::test]
async fn test_deferred_is_promoted_only_after_its_time() {
    let email = MockSender::ok(ChannelKind::Email);
    let engine = TestEngine::new(&[email.clone()]);
    let scheduled_at = Utc::now() + chrono::Duration::minutes(10);
    let mut req = request("normal", UserId::new());
    req.scheduled_at = Some(scheduled_at);
    let id = engine.dispatcher.submit(req).await.unwrap().notification_id;

    let early = engine
        .scheduler
        .run_promotion_sweep_at(scheduled_at - chrono::Duration::minutes(5))
        .await
        .unwrap();
    assert_eq!(early.selected, 0);
    assert_eq!(engine.stored(id).await.status, NotificationStatus::Pending);
    assert_eq!(email.calls(), 0);

    let due = engine
        .scheduler
        .run_promotion_sweep_at(scheduled_at + chrono::Duration::seconds(1))
        .await
        .unwrap();
    assert_eq!((due.selected, due.handled), (1, 1));
    assert_eq!(email.calls(), 1);
    assert_eq!(engine.stored(id).await.status, NotificationStatus::Delivered);

    let again = engine
        .scheduler
        .run_promotion_sweep_at(scheduled_at + chrono::Duration::minutes(1))
        .await
        .unwrap();
    assert_eq!(again.selected, 0);
    assert_eq!(email.calls(), 1);
}

#[tokio::test]
async fn test_promotion_loop_delivers_within_one_interval() {
    let email = MockSender::ok(ChannelKind::Email);
    let engine = TestEngine::new(&[email.clone()]);
    let scheduler = Arc::new(Scheduler::new(
        Arc::clone(&engine.store),
        Arc::clone(&engine.dispatcher),
        SchedulerConfig {
            promotion_interval_seconds: 1,
            ..SchedulerConfig::default()
        },
    ));

    let scheduled_at = Utc::now() + chrono::Duration::seconds(1);
    let mut req = request("normal", UserId::new());
    req.scheduled_at = Some(scheduled_at);
    let id = engine.dispatcher.submit(req).await.unwrap().notification_id;

    let (tx, rx) = watch::channel(false);
    let sweeper = Arc::clone(&scheduler);
    let task = tokio::spawn(async move { sweeper.run_promotion(rx).await });

    let delivered = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if engine.stored(id).await.status == NotificationStatus::Delivered {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await;
    tx.send(true).unwrap();
    task.await.unwrap();

    assert!(delivered.is_ok(), "notification was never promoted");
    let attempts = engine.attempts(id).await;
    assert_eq!(attempts.len(), 1);
    assert!(attempts[0].attempted_at >= scheduled_at);
}

#[tokio::test]
async fn test_overlapping_promotion_sweeps_send_once() {
    let email = MockSender::ok(ChannelKind::Email);
    let engine = TestEngine::new(&[email.clone()]);
    let scheduled_at = Utc::now() + chrono::Duration::minutes(1);
    let mut req = request("normal", UserId::new());
    req.scheduled_at = Some(scheduled_at);
    engine.dispatcher.submit(req).await.unwrap();

    let later = scheduled_at + chrono::Duration::seconds(5);
    let (a, b) = tokio::join!(
        engine.scheduler.run_promotion_sweep_at(later),
        engine.scheduler.run_promotion_sweep_at(later),
    );

    assert_eq!(a.unwrap().handled + b.unwrap().handled, 1);
    assert_eq!(email.calls(), 1);
}

#[tokio::test]
async fn test_retry_recovers_partial_delivery() {
    let push = MockSender::ok(ChannelKind::Push);
    let email = MockSender::failing(ChannelKind::Email);
    let engine = TestEngine::new(&[push.clone(), email.clone()]);
    let user = UserId::new();
    engine.prefs.set(user, &[("push", true), ("email", true)]);

    let outcome = engine
        .dispatcher
        .submit(request("normal", user))
        .await
        .unwrap();
    assert_eq!(outcome.status, NotificationStatus::PartiallyDelivered);

    // Swap in a gateway that accepts.
    let email = MockSender::ok(ChannelKind::Email);
    engine.registry.register(email.clone());

    let report = engine
        .scheduler
        .run_retry_sweep_at(Utc::now() + chrono::Duration::minutes(10))
        .await
        .unwrap();

    assert_eq!((report.selected, report.handled), (1, 1));
    assert_eq!(push.calls(), 1);
    assert_eq!(email.calls(), 1);
    assert_eq!(
        engine.stored(outcome.notification_id).await.status,
        NotificationStatus::Delivered
    );

    let next = engine
        .scheduler
        .run_retry_sweep_at(Utc::now() + chrono::Duration::minutes(20))
        .await
        .unwrap();
    assert_eq!(next.selected, 0);
}

#[tokio::test]
async fn test_retry_sends_once_per_cycle() {
    let email = MockSender::failing(ChannelKind::Email);
    let engine = TestEngine::new(&[email.clone()]);

    let outcome = engine
        .dispatcher
        .submit(request("normal", UserId::new()))
        .await
        .unwrap();
    assert_eq!(outcome.status, NotificationStatus::Failed);
    assert_eq!(email.calls(), 1);

    let report = engine
        .scheduler
        .run_retry_sweep_at(Utc::now() + chrono::Duration::minutes(10))
        .await
        .unwrap();
    assert_eq!((report.selected, report.handled), (1, 1));
    assert_eq!(email.calls(), 2);

    // The fresh failure is inside its cooldown now.
    let report = engine
        .scheduler
        .run_retry_sweep_at(Utc::now())
        .await
        .unwrap();
    assert_eq!(report.selected, 0);
    assert_eq!(email.calls(), 2);

    let attempts = engine.attempts(outcome.notification_id).await;
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].status, DeliveryStatus::Failed);
}

#[tokio::test]
async fn test_retry_leaves_unavailable_channel_untouched() {
    let email = MockSender::failing(ChannelKind::Email);
    let engine = TestEngine::new(&[email.clone()]);

    let outcome = engine
        .dispatcher
        .submit(request("normal", UserId::new()))
        .await
        .unwrap();
    let before = engine.attempts(outcome.notification_id).await;
    engine.registry.set_available(ChannelKind::Email, false);

    let report = engine
        .scheduler
        .run_retry_sweep_at(Utc::now() + chrono::Duration::minutes(10))
        .await
        .unwrap();

    assert_eq!((report.selected, report.skipped), (1, 1));
    assert_eq!(email.calls(), 1);
    assert_eq!(engine.attempts(outcome.notification_id).await, before);
}

#[tokio::test]
async fn test_retry_ignores_notifications_outside_window() {
    let email = MockSender::failing(ChannelKind::Email);
    let engine = TestEngine::new(&[email.clone()]);
    let old = request("normal", UserId::new())
        .into_notification(Utc::now() - chrono::Duration::hours(30))
        .unwrap();

    let outcome = engine.dispatcher.submit_notification(old).await.unwrap();
    assert_eq!(outcome.status, NotificationStatus::Failed);

    let report = engine
        .scheduler
        .run_retry_sweep_at(Utc::now() + chrono::Duration::minutes(10))
        .await
        .unwrap();
    assert_eq!(report.selected, 0);
    assert_eq!(email.calls(), 1);
}

#[tokio::test]
async fn test_sweep_store_error_is_reported_and_recovers() {
    let email = MockSender::ok(ChannelKind::Email);
    let store = Arc::new(FlakyStore::default());
    let engine = TestEngine::with_store(store.clone(), &[email.clone()]);
    let scheduled_at = Utc::now() + chrono::Duration::minutes(1);
    let mut req = request("normal", UserId::new());
    req.scheduled_at = Some(scheduled_at);
    let id = engine.dispatcher.submit(req).await.unwrap().notification_id;
    let later = scheduled_at + chrono::Duration::seconds(1);

    store.set_broken(true);
    assert!(engine.scheduler.run_promotion_sweep_at(later).await.is_err());
    assert!(engine.scheduler.run_retry_sweep_at(later).await.is_err());
    assert_eq!(engine.stored(id).await.status, NotificationStatus::Pending);

    store.set_broken(false);
    let report = engine.scheduler.run_promotion_sweep_at(later).await.unwrap();
    assert_eq!(report.handled, 1);
    assert_eq!(engine.stored(id).await.status, NotificationStatus::Delivered);
}

#[tokio::test(start_paused = true)]
async fn test_submit_racing_promotion_sweep_delivers_once() {
    let push = MockSender::ok(ChannelKind::Push);
    let store = Arc::new(FlakyStore::default());
    store.set_insert_delay(Duration::from_millis(50));
    let engine = TestEngine::with_store(store.clone(), &[push.clone()]);
    let mut req = request("emergency", UserId::new());
    req.scheduled_at = Some(Utc::now() - chrono::Duration::seconds(5));

    let sweep = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        engine.scheduler.run_promotion_sweep_at(Utc::now()).await
    };
    let (submitted, swept) = tokio::join!(engine.dispatcher.submit(req), sweep);

    assert_eq!(swept.unwrap().handled, 1);
    let submitted = submitted.unwrap();
    assert!(submitted.attempts.is_empty());
    assert_eq!(submitted.status, NotificationStatus::Delivered);
    assert_eq!(push.calls(), 1);
}

#[tokio::test]
async fn test_retry_sweep_follows_priority_then_age() {
    let email = MockSender::failing(ChannelKind::Email);
    let engine = TestEngine::new(&[email.clone()]);
    let now = Utc::now();

    let mut ids = Vec::new();
    for (priority, age_hours) in [
        ("normal", 5),
        ("high", 1),
        ("normal", 2),
        ("high", 3),
        ("emergency", 4),
    ] {
        let notification = request(priority, UserId::new())
            .into_notification(now - chrono::Duration::hours(age_hours))
            .unwrap();
        let outcome = engine
            .dispatcher
            .submit_notification(notification)
            .await
            .unwrap();
        assert_eq!(outcome.status, NotificationStatus::Failed);
        ids.push(outcome.notification_id);
    }
    assert_eq!(email.calls(), 5);

    let scheduler = Scheduler::new(
        Arc::clone(&engine.store),
        Arc::clone(&engine.dispatcher),
        SchedulerConfig {
            retry_batch_size: 3,
            ..SchedulerConfig::default()
        },
    );
    let report = scheduler
        .run_retry_sweep_at(now + chrono::Duration::minutes(10))
        .await
        .unwrap();

    assert_eq!((report.selected, report.handled), (3, 3));
    assert_eq!(email.sent()[5..], [ids[4], ids[3], ids[1]]);
}
