//! Supervision of the engine's background tasks.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::health::ChannelHealthMonitor;
use crate::ingest::IngestLoop;
use crate::scheduler::Scheduler;

/// Owns the background tasks and the shutdown signal they share.
#[derive(Debug)]
pub struct ServiceRunner {
    shutdown: watch::Sender<bool>,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
    drain_timeout: Duration,
}

impl ServiceRunner {
    /// Create a runner with no tasks.
    pub fn new(drain_timeout: Duration) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            shutdown,
            tasks: Vec::new(),
            drain_timeout,
        }
    }

    /// Start ingest, both sweeps and the health monitor.
    pub fn start(
        drain_timeout: Duration,
        ingest: Arc<IngestLoop>,
        scheduler: Arc<Scheduler>,
        health: Arc<ChannelHealthMonitor>,
    ) -> Self {
        let mut runner = Self::new(drain_timeout);
        runner.spawn("ingest", move |cancel| async move { ingest.run(cancel).await });
        let promotion = Arc::clone(&scheduler);
        runner.spawn("promotion-sweep", move |cancel| async move {
            promotion.run_promotion(cancel).await
        });
        runner.spawn("retry-sweep", move |cancel| async move {
            scheduler.run_retry(cancel).await
        });
        runner.spawn("channel-health", move |cancel| async move { health.run(cancel).await });
        runner
    }

    /// Spawn a task that receives the shutdown signal.
    pub fn spawn<F, Fut>(&mut self, name: &'static str, task: F)
    where
        F: FnOnce(watch::Receiver<bool>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(task(self.shutdown.subscribe()));
        tracing::info!("Started task '{}'", name);
        self.tasks.push((name, handle));
    }

    /// Number of supervised tasks.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Signal shutdown and wait up to the drain timeout for every task.
    /// Tasks still running afterwards are aborted. Returns `true` when all
    /// tasks exited on their own.
    pub async fn shutdown(self) -> bool {
        tracing::info!("Shutting down {} background tasks", self.tasks.len());
        let _ = self.shutdown.send(true);

        let aborts: Vec<_> = self
            .tasks
            .iter()
            .map(|(name, handle)| (*name, handle.abort_handle()))
            .collect();
        let names: Vec<&'static str> = self.tasks.iter().map(|(name, _)| *name).collect();
        let handles = self.tasks.into_iter().map(|(_, handle)| handle);

        match tokio::time::timeout(self.drain_timeout, join_all(handles)).await {
            Ok(results) => {
                for (name, result) in names.iter().zip(results) {
                    if let Err(e) = result {
                        tracing::error!(task = *name, error = %e, "Task ended abnormally");
                    }
                }
                tracing::info!("All background tasks stopped");
                true
            }
            Err(_) => {
                for (name, abort) in aborts {
                    if !abort.is_finished() {
                        tracing::warn!("Task '{}' did not drain in time, aborting", name);
                        abort.abort();
                    }
                }
                false
            }
        }
    }
}
