//! PostgreSQL notification store.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{FromRow, PgPool};

use herald_core::error::{AppError, ErrorKind};
use herald_core::result::AppResult;
use herald_core::types::NotificationId;
use herald_entity::{ChannelKind, DeliveryAttempt, Notification, NotificationStatus};

use crate::store::{NotificationStore, RetryCandidate};

/// Notification store over the `notifications` and
/// `notification_delivery_status` tables.
#[derive(Debug, Clone)]
pub struct PgNotificationStore {
    pool: PgPool,
}

impl PgNotificationStore {
    /// Create a new store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct RetryRow {
    #[sqlx(flatten)]
    notification: Notification,
    failed_channel: ChannelKind,
}

fn db_err(message: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::with_source(ErrorKind::Database, message, e)
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn insert(&self, n: &Notification) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO notifications (id, user_id, type, title, message, priority, channels, \
             scheduled_at, status, metadata, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(n.id)
        .bind(n.user_id)
        .bind(&n.notification_type)
        .bind(&n.title)
        .bind(&n.message)
        .bind(n.priority)
        .bind(&n.channels)
        .bind(n.scheduled_at)
        .bind(n.status)
        .bind(&n.metadata)
        .bind(n.created_at)
        .bind(n.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to insert notification"))?;
        Ok(())
    }

    async fn find_by_id(&self, id: NotificationId) -> AppResult<Option<Notification>> {
        sqlx::query_as::<_, Notification>("SELECT * FROM notifications WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to load notification"))
    }

    async fn update_status(
        &self,
        id: NotificationId,
        status: NotificationStatus,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE notifications SET status = $1, updated_at = $2 \
             WHERE id = $3 AND status = ANY($4)",
        )
        .bind(status)
        .bind(now)
        .bind(id)
        .bind(NotificationStatus::predecessors(status))
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to update notification status"))?;
        Ok(result.rows_affected() == 1)
    }

    async fn claim_pending(&self, id: NotificationId, now: DateTime<Utc>) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE notifications SET status = 'processing', updated_at = $2 \
             WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to claim notification"))?;
        Ok(result.rows_affected() == 1)
    }

    async fn find_due(&self, now: DateTime<Utc>, limit: u32) -> AppResult<Vec<Notification>> {
        sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications \
             WHERE status = 'pending' AND scheduled_at <= $1 \
             ORDER BY priority DESC, scheduled_at ASC \
             LIMIT $2",
        )
        .bind(now)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to query due notifications"))
    }

    async fn upsert_attempt(&self, attempt: &DeliveryAttempt) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO notification_delivery_status \
             (notification_id, channel, status, attempted_at, last_error) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (notification_id, channel) \
             DO UPDATE SET status = EXCLUDED.status, attempted_at = EXCLUDED.attempted_at, \
             last_error = EXCLUDED.last_error",
        )
        .bind(attempt.notification_id)
        .bind(attempt.channel)
        .bind(attempt.status)
        .bind(attempt.attempted_at)
        .bind(&attempt.last_error)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to upsert delivery attempt"))?;
        Ok(())
    }

    async fn attempts_for(&self, id: NotificationId) -> AppResult<Vec<DeliveryAttempt>> {
        sqlx::query_as::<_, DeliveryAttempt>(
            "SELECT * FROM notification_delivery_status WHERE notification_id = $1 \
             ORDER BY channel",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to load delivery attempts"))
    }

    async fn find_retry_candidates(
        &self,
        now: DateTime<Utc>,
        cooldown: Duration,
        window: Duration,
        limit: u32,
    ) -> AppResult<Vec<RetryCandidate>> {
        let rows = sqlx::query_as::<_, RetryRow>(
            "SELECT n.*, d.channel AS failed_channel \
             FROM notifications n \
             JOIN notification_delivery_status d ON n.id = d.notification_id \
             WHERE d.status = 'failed' \
             AND d.attempted_at < $1 \
             AND n.created_at > $2 \
             AND n.status IN ('failed', 'partially_delivered') \
             ORDER BY n.priority DESC, n.created_at ASC, d.channel ASC \
             LIMIT $3",
        )
        .bind(now - cooldown)
        .bind(now - window)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to query retry candidates"))?;

        Ok(rows
            .into_iter()
            .map(|row| RetryCandidate {
                notification: row.notification,
                channel: row.failed_channel,
            })
            .collect())
    }
}
