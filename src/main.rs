//! Herald Server: notification dispatch and delivery-reliability engine
//!
//! Main entry point that wires all crates together and runs the background
//! tasks until a shutdown signal arrives.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

use herald_cache::CacheManager;
use herald_core::config::AppConfig;
use herald_core::error::AppError;
use herald_core::traits::CacheProvider;
use herald_database::{DatabasePool, NotificationStore, PgNotificationStore, PgPreferenceSource};
use herald_engine::{ChannelRegistry, Dispatcher, PreferenceResolver};
use herald_worker::{ChannelHealthMonitor, IngestLoop, Scheduler, ServiceRunner};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Engine error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from files and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("HERALD_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Wire the engine and run it until shutdown
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Herald v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Database ─────────────────────────────────────────
    let db = DatabasePool::open(&config.database).await?;
    db.ping().await?;
    tracing::info!("Notification store reachable");
    let store: Arc<dyn NotificationStore> = Arc::new(PgNotificationStore::new(db.pool().clone()));
    let preference_source = Arc::new(PgPreferenceSource::new(db.pool().clone()));

    // ── Step 2: Preference cache ─────────────────────────────────
    tracing::info!(
        "Initializing preference cache (provider: {})...",
        config.cache.provider
    );
    let cache = CacheManager::new(&config.cache).await?;
    if !cache.health_check().await? {
        return Err(AppError::cache(format!(
            "Preference cache '{}' failed its health check",
            config.cache.provider
        )));
    }
    let resolver = Arc::new(PreferenceResolver::new(
        preference_source,
        cache,
        Duration::from_secs(config.cache.preference_ttl_seconds),
    ));

    // ── Step 3: Channels ─────────────────────────────────────────
    let senders = herald_channels::build_senders(&config.channels)?;
    if senders.is_empty() {
        tracing::warn!("No delivery channel enabled; every notification will fail routing");
    }
    let registry = Arc::new(ChannelRegistry::with_senders(senders));

    // ── Step 4: Engine ───────────────────────────────────────────
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&store),
        Arc::clone(&registry),
        resolver,
        config.dispatch.send_timeout(),
    ));

    // ── Step 5: Background tasks ─────────────────────────────────
    let source = herald_worker::sources::from_config(&config.ingest).await?;
    let ingest = Arc::new(IngestLoop::new(
        source,
        Arc::clone(&dispatcher),
        config.ingest.clone(),
    ));
    let scheduler = Arc::new(Scheduler::new(
        Arc::clone(&store),
        Arc::clone(&dispatcher),
        config.scheduler.clone(),
    ));
    let health = Arc::new(ChannelHealthMonitor::new(
        Arc::clone(&registry),
        Duration::from_secs(config.health.channel_check_interval_seconds),
    ));

    let runner = ServiceRunner::start(config.scheduler.drain_timeout(), ingest, scheduler, health);
    tracing::info!("Herald running with {} background tasks", runner.task_count());

    // ── Step 6: Graceful shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, draining...");
    if !runner.shutdown().await {
        tracing::warn!("Some tasks were aborted before finishing");
    }
    db.close().await;

    tracing::info!("Herald stopped");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
