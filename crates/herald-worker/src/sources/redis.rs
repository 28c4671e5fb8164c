//! Redis list event source. Producers `RPUSH` JSON bodies onto a list named
//! after the topic; this source pops from the head.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use herald_core::error::{AppError, ErrorKind};
use herald_core::result::AppResult;
use herald_core::traits::{EventSource, RawEvent};

/// Pause between empty polls of all topics.
const IDLE_BACKOFF: Duration = Duration::from_millis(200);

/// Event source reading one Redis list per topic.
#[derive(Clone)]
pub struct RedisEventSource {
    conn: ConnectionManager,
}

impl std::fmt::Debug for RedisEventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisEventSource").finish()
    }
}

impl RedisEventSource {
    /// Connect to Redis.
    pub async fn connect(url: &str) -> AppResult<Self> {
        let client = redis::Client::open(url).map_err(|e| {
            AppError::with_source(ErrorKind::ExternalService, "Invalid Redis URL for ingest", e)
        })?;
        let conn = ConnectionManager::new(client).await.map_err(|e| {
            AppError::with_source(ErrorKind::ExternalService, "Failed to connect ingest to Redis", e)
        })?;
        Ok(Self { conn })
    }

    /// Push a message onto a topic.
    pub async fn publish(&self, topic: &str, payload: &[u8]) -> AppResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.rpush(topic, payload).await.map_err(Self::map_err)?;
        Ok(())
    }

    fn map_err(e: redis::RedisError) -> AppError {
        AppError::with_source(ErrorKind::ExternalService, format!("Redis error: {e}"), e)
    }

    async fn pop(&self, topic: &str, count: usize) -> AppResult<Vec<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let popped: Option<Vec<Vec<u8>>> = redis::cmd("LPOP")
            .arg(topic)
            .arg(count)
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(popped.unwrap_or_default())
    }
}

#[async_trait]
impl EventSource for RedisEventSource {
    async fn poll(
        &self,
        topics: &[String],
        max: usize,
        timeout: Duration,
    ) -> AppResult<Vec<RawEvent>> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let mut batch = Vec::new();
            for topic in topics {
                let room = max.saturating_sub(batch.len());
                if room == 0 {
                    break;
                }
                for payload in self.pop(topic, room).await? {
                    batch.push(RawEvent::new(topic.clone(), payload));
                }
            }
            if !batch.is_empty() {
                return Ok(batch);
            }
            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Ok(batch);
            }
            tokio::time::sleep(IDLE_BACKOFF.min(deadline - now)).await;
        }
    }
}
