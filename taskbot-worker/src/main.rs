//! # Taskbot Worker
//!
//! Runs the deadline scheduler against the task database until Ctrl-C.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p taskbot-worker
//! ```

use anyhow::Context;
use std::sync::Arc;
use taskbot_shared::{
    config::LogFormat,
    db::{
        migrations::migration_status,
        pool::{close_pool, create_pool},
    },
    store::PgStore,
    transport::TelegramClient,
};
use taskbot_worker::{config::Config, scheduler::DeadlineScheduler};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "taskbot_worker=debug,taskbot_shared=info".into());

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(config.common.log_format);

    tracing::info!("Taskbot Worker v{} starting", env!("CARGO_PKG_VERSION"));

    let pool = create_pool(config.common.database().named("taskbot-worker"))
        .await
        .context("Failed to connect to database")?;

    // Migrations are applied by the API server.
    match migration_status(&pool).await {
        Ok(status) if status.is_current() => tracing::info!(
            applied = status.applied,
            latest = ?status.latest_version,
            "Database schema is current"
        ),
        Ok(status) => tracing::warn!(
            pending = status.pending,
            "Database schema is behind; start taskbot-api to apply migrations"
        ),
        Err(e) => tracing::warn!(error = %e, "Could not read migration status"),
    }

    let transport = TelegramClient::new(&config.common.telegram())
        .context("Failed to build Telegram client")?;

    let scheduler = DeadlineScheduler::new(
        Arc::new(PgStore::new(pool.clone())),
        Arc::new(transport),
        config.scheduler.clone(),
    );

    let shutdown = scheduler.shutdown_token();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
        }
        tracing::info!("Shutdown signal received");
        shutdown.cancel();
    });

    scheduler.run().await;

    close_pool(pool).await;
    Ok(())
}
