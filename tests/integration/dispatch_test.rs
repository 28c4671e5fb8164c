//! Routing and fan-out behaviour of the dispatcher, end to end.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;

use herald_channels::SendError;
use herald_core::error::ErrorKind;
use herald_core::types::UserId;
use herald_engine::DeliveryTracker;
use herald_entity::{ChannelKind, DeliveryAttempt, DeliveryStatus, NotificationStatus};
use herald_worker::ChannelHealthMonitor;

use crate::helpers::{MockSender, TestEngine, request};

#[tokio::test]
async fn test_emergency_reaches_every_channel_despite_preferences() {
    let push = MockSender::ok(ChannelKind::Push);
    let sms = MockSender::ok(ChannelKind::Sms);
    let email = MockSender::ok(ChannelKind::Email);
    let engine = TestEngine::new(&[push.clone(), sms.clone(), email.clone()]);
    let user = UserId::new();
    engine
        .prefs
        .set(user, &[("push", false), ("sms", false), ("email", false)]);

    let outcome = engine
        .dispatcher
        .submit(request("emergency", user))
        .await
        .unwrap();

    assert_eq!((push.calls(), sms.calls(), email.calls()), (1, 1, 1));
    assert_eq!(outcome.status, NotificationStatus::Delivered);
    assert_eq!(engine.attempts(outcome.notification_id).await.len(), 3);
}

#[tokio::test]
async fn test_emergency_with_email_down_delivers_on_push_and_sms() {
    let push = MockSender::ok(ChannelKind::Push);
    let sms = MockSender::ok(ChannelKind::Sms);
    let email = MockSender::ok(ChannelKind::Email);
    let engine = TestEngine::new(&[push.clone(), sms.clone(), email.clone()]);
    engine.registry.set_available(ChannelKind::Email, false);

    let outcome = engine
        .dispatcher
        .submit(request("emergency", UserId::new()))
        .await
        .unwrap();

    let attempts = engine.attempts(outcome.notification_id).await;
    let channels: Vec<_> = attempts.iter().map(|a| a.channel).collect();
    assert_eq!(channels, vec![ChannelKind::Push, ChannelKind::Sms]);
    assert!(attempts.iter().all(|a| a.status == DeliveryStatus::Delivered));
    assert_eq!(email.calls(), 0);
    assert_eq!(outcome.status, NotificationStatus::Delivered);
    assert_eq!(
        engine.stored(outcome.notification_id).await.status,
        NotificationStatus::Delivered
    );
}

#[tokio::test]
async fn test_emergency_with_one_failure_is_partial() {
    let push = MockSender::ok(ChannelKind::Push);
    let sms = MockSender::failing(ChannelKind::Sms);
    let engine = TestEngine::new(&[push, sms]);

    let outcome = engine
        .dispatcher
        .submit(request("emergency", UserId::new()))
        .await
        .unwrap();

    assert_eq!(outcome.status, NotificationStatus::PartiallyDelivered);
}

#[tokio::test]
async fn test_high_push_success_short_circuits() {
    let push = MockSender::ok(ChannelKind::Push);
    let sms = MockSender::ok(ChannelKind::Sms);
    let email = MockSender::ok(ChannelKind::Email);
    let engine = TestEngine::new(&[push.clone(), sms.clone(), email.clone()]);

    let outcome = engine
        .dispatcher
        .submit(request("high", UserId::new()))
        .await
        .unwrap();

    assert_eq!((push.calls(), sms.calls(), email.calls()), (1, 0, 0));
    assert_eq!(outcome.status, NotificationStatus::Delivered);
}

#[tokio::test]
async fn test_high_push_fails_sms_succeeds() {
    let push = MockSender::failing(ChannelKind::Push);
    let sms = MockSender::ok(ChannelKind::Sms);
    let email = MockSender::ok(ChannelKind::Email);
    let engine = TestEngine::new(&[push.clone(), sms.clone(), email.clone()]);

    let outcome = engine
        .dispatcher
        .submit(request("high", UserId::new()))
        .await
        .unwrap();

    let attempts = engine.attempts(outcome.notification_id).await;
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[0].channel, ChannelKind::Push);
    assert_eq!(attempts[0].status, DeliveryStatus::Failed);
    assert_eq!(attempts[1].channel, ChannelKind::Sms);
    assert_eq!(attempts[1].status, DeliveryStatus::Delivered);
    assert_eq!(email.calls(), 0);
    assert_eq!(
        engine.stored(outcome.notification_id).await.status,
        NotificationStatus::Delivered
    );
}

#[tokio::test]
async fn test_high_both_primaries_fail_sends_exactly_one_email() {
    let push = MockSender::failing(ChannelKind::Push);
    let sms = MockSender::scripted(
        ChannelKind::Sms,
        vec![Err(SendError::Rejected("unknown number".into()))],
    );
    let email = MockSender::ok(ChannelKind::Email);
    let engine = TestEngine::new(&[push.clone(), sms.clone(), email.clone()]);

    let outcome = engine
        .dispatcher
        .submit(request("high", UserId::new()))
        .await
        .unwrap();

    assert_eq!((push.calls(), sms.calls(), email.calls()), (1, 1, 1));
    assert_eq!(outcome.status, NotificationStatus::Delivered);
}

#[tokio::test]
async fn test_high_everything_fails() {
    let push = MockSender::failing(ChannelKind::Push);
    let sms = MockSender::failing(ChannelKind::Sms);
    let email = MockSender::failing(ChannelKind::Email);
    let engine = TestEngine::new(&[push, sms, email.clone()]);

    let outcome = engine
        .dispatcher
        .submit(request("high", UserId::new()))
        .await
        .unwrap();

    assert_eq!(email.calls(), 1);
    assert_eq!(outcome.status, NotificationStatus::Failed);
}

#[tokio::test]
async fn test_high_uses_fallback_when_no_primary_available() {
    let email = MockSender::ok(ChannelKind::Email);
    let engine = TestEngine::new(&[email.clone()]);

    let outcome = engine
        .dispatcher
        .submit(request("high", UserId::new()))
        .await
        .unwrap();

    assert_eq!(email.calls(), 1);
    assert_eq!(outcome.status, NotificationStatus::Delivered);
}

#[tokio::test]
async fn test_normal_follows_preferences() {
    let push = MockSender::ok(ChannelKind::Push);
    let sms = MockSender::ok(ChannelKind::Sms);
    let email = MockSender::ok(ChannelKind::Email);
    let engine = TestEngine::new(&[push.clone(), sms.clone(), email.clone()]);
    let user = UserId::new();
    engine.prefs.set(user, &[("email", true), ("sms", false)]);

    let outcome = engine
        .dispatcher
        .submit(request("normal", user))
        .await
        .unwrap();

    assert_eq!((push.calls(), sms.calls(), email.calls()), (0, 0, 1));
    assert_eq!(outcome.status, NotificationStatus::Delivered);
}

#[tokio::test]
async fn test_normal_two_enabled_channels_both_delivered() {
    let push = MockSender::ok(ChannelKind::Push);
    let email = MockSender::ok(ChannelKind::Email);
    let engine = TestEngine::new(&[push.clone(), email.clone()]);
    let user = UserId::new();
    engine.prefs.set(user, &[("email", true), ("push", true)]);

    let outcome = engine
        .dispatcher
        .submit(request("normal", user))
        .await
        .unwrap();

    let attempts = engine.attempts(outcome.notification_id).await;
    assert_eq!(attempts.len(), 2);
    assert!(attempts.iter().all(|a| a.status == DeliveryStatus::Delivered));
    assert_eq!(outcome.status, NotificationStatus::Delivered);
}

#[tokio::test]
async fn test_normal_without_stored_preferences_uses_email() {
    let push = MockSender::ok(ChannelKind::Push);
    let email = MockSender::ok(ChannelKind::Email);
    let engine = TestEngine::new(&[push.clone(), email.clone()]);

    engine
        .dispatcher
        .submit(request("normal", UserId::new()))
        .await
        .unwrap();

    assert_eq!((push.calls(), email.calls()), (0, 1));
}

#[tokio::test]
async fn test_normal_hint_restricts_enabled_channels() {
    let push = MockSender::ok(ChannelKind::Push);
    let sms = MockSender::ok(ChannelKind::Sms);
    let email = MockSender::ok(ChannelKind::Email);
    let engine = TestEngine::new(&[push.clone(), sms.clone(), email.clone()]);
    let user = UserId::new();
    engine
        .prefs
        .set(user, &[("push", true), ("sms", true), ("email", true)]);

    let mut req = request("normal", user);
    req.channels = vec!["sms".to_string(), "fax".to_string()];
    engine.dispatcher.submit(req).await.unwrap();

    assert_eq!((push.calls(), sms.calls(), email.calls()), (0, 1, 0));
}

#[tokio::test]
async fn test_no_viable_channel_marks_failed() {
    let push = MockSender::ok(ChannelKind::Push);
    let engine = TestEngine::new(&[push.clone()]);
    let user = UserId::new();
    engine.prefs.set(user, &[("email", true)]);

    let err = engine
        .dispatcher
        .submit(request("normal", user))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NoViableChannel);
    assert_eq!(push.calls(), 0);
}

#[tokio::test]
async fn test_invalid_request_is_rejected_before_storage() {
    let email = MockSender::ok(ChannelKind::Email);
    let engine = TestEngine::new(&[email.clone()]);

    let mut req = request("normal", UserId::new());
    req.user_id = "not-a-uuid".to_string();
    let err = engine.dispatcher.submit(req).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::Validation);
    assert_eq!(email.calls(), 0);
}

#[tokio::test]
async fn test_deferred_notification_stays_pending() {
    let email = MockSender::ok(ChannelKind::Email);
    let engine = TestEngine::new(&[email.clone()]);
    let mut req = request("normal", UserId::new());
    req.scheduled_at = Some(Utc::now() + chrono::Duration::minutes(10));

    let outcome = engine.dispatcher.submit(req).await.unwrap();

    assert!(outcome.is_deferred());
    assert_eq!(email.calls(), 0);
    assert!(engine.attempts(outcome.notification_id).await.is_empty());
    assert_eq!(
        engine.stored(outcome.notification_id).await.status,
        NotificationStatus::Pending
    );
}

#[tokio::test]
async fn test_tracker_upsert_keeps_latest_record() {
    let engine = TestEngine::new(&[]);
    let tracker = DeliveryTracker::new(Arc::clone(&engine.store));
    let notification = request("normal", UserId::new())
        .into_notification(Utc::now())
        .unwrap();
    engine.store.insert(&notification).await.unwrap();

    let first = Utc::now();
    tracker
        .record(&DeliveryAttempt::failed(
            notification.id,
            ChannelKind::Email,
            first,
            "smtp 421",
        ))
        .await
        .unwrap();
    let second = first + chrono::Duration::seconds(5);
    tracker
        .record(&DeliveryAttempt::delivered(
            notification.id,
            ChannelKind::Email,
            second,
        ))
        .await
        .unwrap();

    let attempts = tracker.attempts(&notification).await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].status, DeliveryStatus::Delivered);
    assert_eq!(attempts[0].attempted_at, second);
    assert_eq!(attempts[0].last_error, None);
}

#[tokio::test]
async fn test_preferences_are_cached_between_submissions() {
    let email = MockSender::ok(ChannelKind::Email);
    let engine = TestEngine::new(&[email.clone()]);
    let user = UserId::new();
    engine.prefs.set(user, &[("email", true)]);

    for _ in 0..3 {
        engine
            .dispatcher
            .submit(request("normal", user))
            .await
            .unwrap();
    }

    assert_eq!(email.calls(), 3);
    assert_eq!(engine.prefs.fetch_count(), 1);
}

#[tokio::test]
async fn test_concurrent_resolves_fetch_once() {
    let engine = TestEngine::new(&[]);
    let user = UserId::new();
    engine.prefs.set(user, &[("sms", true)]);

    let resolved = join_all((0..10).map(|_| engine.resolver.resolve(user))).await;

    assert!(resolved.iter().all(|p| p.is_enabled(ChannelKind::Sms)));
    assert_eq!(engine.prefs.fetch_count(), 1);
}

#[tokio::test]
async fn test_invalidated_preferences_are_refetched() {
    let sms = MockSender::ok(ChannelKind::Sms);
    let email = MockSender::ok(ChannelKind::Email);
    let engine = TestEngine::new(&[sms.clone(), email.clone()]);
    let user = UserId::new();
    engine.prefs.set(user, &[("email", true)]);

    engine
        .dispatcher
        .submit(request("normal", user))
        .await
        .unwrap();
    engine.prefs.set(user, &[("sms", true)]);
    engine.resolver.invalidate(user).await;
    engine
        .dispatcher
        .submit(request("normal", user))
        .await
        .unwrap();

    assert_eq!((sms.calls(), email.calls()), (1, 1));
    assert_eq!(engine.prefs.fetch_count(), 2);
}

#[tokio::test]
async fn test_health_monitor_feeds_routing() {
    let push = MockSender::ok(ChannelKind::Push);
    let sms = MockSender::ok(ChannelKind::Sms);
    let engine = TestEngine::new(&[push.clone(), sms.clone()]);
    let monitor = ChannelHealthMonitor::new(
        Arc::clone(&engine.registry),
        std::time::Duration::from_secs(30),
    );

    push.set_healthy(false);
    assert_eq!(monitor.check_once().await, 1);
    engine
        .dispatcher
        .submit(request("emergency", UserId::new()))
        .await
        .unwrap();
    assert_eq!((push.calls(), sms.calls()), (0, 1));

    push.set_healthy(true);
    assert_eq!(monitor.check_once().await, 1);
    engine
        .dispatcher
        .submit(request("emergency", UserId::new()))
        .await
        .unwrap();
    assert_eq!((push.calls(), sms.calls()), (1, 2));
}

#[tokio::test]
async fn test_replayed_request_id_is_not_delivered_again() {
    let push = MockSender::ok(ChannelKind::Push);
    let engine = TestEngine::new(&[push.clone()]);
    let mut req = request("emergency", UserId::new());
    req.id = Some(uuid::Uuid::now_v7());

    let first = engine.dispatcher.submit(req.clone()).await.unwrap();
    let err = engine.dispatcher.submit(req).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::Database);
    assert_eq!(push.calls(), 1);
    assert_eq!(
        engine.stored(first.notification_id).await.status,
        NotificationStatus::Delivered
    );
}
