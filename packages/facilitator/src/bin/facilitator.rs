//! Facilitation Agent Engine
//!
//! Starts the scheduler and background workers, then initializes every
//! persisted agent before reporting ready.

use std::sync::Arc;

use anyhow::{Context, Result};
use facilitator_core::domains::agents::{
    builtin_registry, initialize_all, DispatchWorker, GenerationQueue, TickWorker,
};
use facilitator_core::kernel::stream_hub::DEFAULT_CLEANUP_INTERVAL;
use facilitator_core::kernel::{
    tick_channel, BaseScheduler, CronScheduler, FacilitatorDeps, OpenAiCompletionService, PgStore,
    StreamHub,
};
use facilitator_core::Config;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,facilitator_core=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!("Starting facilitation agent engine");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(model = %config.openai_model, "Configuration loaded");

    // Connect to database
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let registry = builtin_registry().context("Failed to register built-in agent types")?;
    tracing::info!(agent_types = ?registry.ids(), "Agent types registered");

    // Timers feed the tick worker
    let (tick_tx, tick_rx) = tick_channel();
    let scheduler = Arc::new(
        CronScheduler::new(tick_tx)
            .await
            .context("Failed to create scheduler")?,
    );
    scheduler.start().await.context("Failed to start scheduler")?;

    let (generation_queue, generations) = GenerationQueue::channel();
    let completion = OpenAiCompletionService::new(&config.openai_api_key, config.openai_model.clone());

    let deps = Arc::new(FacilitatorDeps::new(
        Arc::new(PgStore::new(pool)),
        Arc::new(completion),
        scheduler,
        StreamHub::with_capacity(config.broadcast_capacity),
        Arc::new(registry),
        generation_queue,
    ));

    tokio::spawn(DispatchWorker::new(Arc::clone(&deps), generations).run());
    tokio::spawn(TickWorker::new(Arc::clone(&deps), tick_rx).run());
    deps.stream_hub.spawn_cleanup(DEFAULT_CLEANUP_INTERVAL);

    let report = initialize_all(&deps, config.agent_init_concurrency)
        .await
        .context("Failed to initialize agents")?;
    tracing::info!(
        initialized = report.initialized,
        removed = report.removed,
        failed = report.failed,
        "Facilitation engine ready"
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutting down");

    Ok(())
}
