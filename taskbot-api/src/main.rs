//! # Taskbot API Server
//!
//! Receives Telegram updates on a webhook, runs chat commands against the
//! task store and replies through the Bot API.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p taskbot-api
//! ```

use anyhow::Context;
use std::sync::Arc;
use taskbot_api::{
    app::{build_router, AppState},
    config::Config,
};
use taskbot_shared::{
    config::LogFormat,
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool},
    },
    store::PgStore,
    transport::TelegramClient,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "taskbot_api=debug,taskbot_shared=debug,tower_http=debug".into());

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

    tracing::info!(
        "Taskbot API Server v{} starting (access mode: {})",
        env!("CARGO_PKG_VERSION"),
        config.bot.access_mode
    );

    let pool = create_pool(config.common.database().named("taskbot-api"))
        .await
        .context("Failed to connect to database")?;
    run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;

    let transport = TelegramClient::new(&config.common.telegram())
        .context("Failed to build Telegram client")?;

    let state = AppState::new(
        Arc::new(PgStore::new(pool.clone())),
        Arc::new(transport),
        &config.bot,
        config.api.webhook_secret.clone(),
    );
    if state.webhook_secret.is_none() {
        tracing::warn!("WEBHOOK_SECRET is not set; webhook calls are not authenticated");
    }

    let listener = tokio::net::TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address()))?;
    tracing::info!("Server listening on http://{}", config.bind_address());

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown signal received, closing database pool");
    close_pool(pool).await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
