//! In-process event source for single-node deployments and tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify, RwLock, mpsc};

use herald_core::result::AppResult;
use herald_core::traits::{EventSource, RawEvent};

#[derive(Debug)]
struct Topic {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    rx: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
}

impl Topic {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }
}

/// In-memory event source: one unbounded queue per topic.
#[derive(Debug, Default)]
pub struct MemoryEventSource {
    /// Topic name → queue
    topics: RwLock<HashMap<String, Arc<Topic>>>,
    /// Woken on every publish
    published: Notify,
}

impl MemoryEventSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message to a topic.
    pub async fn publish(&self, topic: &str, payload: impl Into<Vec<u8>>) {
        let queue = self.topic(topic).await;
        // The receiver lives as long as the topic, so this cannot fail.
        let _ = queue.tx.send(payload.into());
        self.published.notify_one();
    }

    async fn topic(&self, name: &str) -> Arc<Topic> {
        if let Some(topic) = self.topics.read().await.get(name) {
            return Arc::clone(topic);
        }
        let mut topics = self.topics.write().await;
        Arc::clone(
            topics
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(Topic::new())),
        )
    }

    async fn drain(&self, topics: &[String], max: usize) -> Vec<RawEvent> {
        let mut batch = Vec::new();
        for name in topics {
            if batch.len() >= max {
                break;
            }
            let topic = self.topic(name).await;
            let mut rx = topic.rx.lock().await;
            while batch.len() < max {
                match rx.try_recv() {
                    Ok(payload) => batch.push(RawEvent::new(name.clone(), payload)),
                    Err(_) => break,
                }
            }
        }
        batch
    }
}

#[async_trait]
impl EventSource for MemoryEventSource {
    async fn poll(
        &self,
        topics: &[String],
        max: usize,
        timeout: Duration,
    ) -> AppResult<Vec<RawEvent>> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let batch = self.drain(topics, max).await;
            if !batch.is_empty() {
                return Ok(batch);
            }
            if tokio::time::timeout_at(deadline, self.published.notified())
                .await
                .is_err()
            {
                return Ok(Vec::new());
            }
        }
    }
}
