/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskbot_api::app::{build_router, AppState};
/// use taskbot_api::config::BotConfig;
/// use taskbot_shared::store::MemoryStore;
/// use taskbot_shared::transport::MockTransport;
///
/// # async fn example() -> anyhow::Result<()> {
/// let state = AppState::new(
///     Arc::new(MemoryStore::new()),
///     Arc::new(MockTransport::new()),
///     &BotConfig::default(),
///     None,
/// );
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, build_router(state)).await?;
/// # Ok(())
/// # }
/// ```

use crate::{config::BotConfig, dispatcher::Dispatcher, responder::Responder};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use taskbot_shared::{store::Store, tasks::TaskService, transport::ChatTransport};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Persistence, used directly by the health check
    pub store: Arc<dyn Store>,

    /// Command routing and wizard sessions
    pub dispatcher: Arc<Dispatcher>,

    /// Outbound messages
    pub responder: Responder,

    /// Expected webhook secret, if any
    pub webhook_secret: Option<Arc<str>>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        transport: Arc<dyn ChatTransport>,
        bot: &BotConfig,
        webhook_secret: Option<String>,
    ) -> Self {
        let service = TaskService::new(store.clone());
        Self {
            store,
            dispatcher: Arc::new(Dispatcher::new(service, bot)),
            responder: Responder::new(transport),
            webhook_secret: webhook_secret.map(Arc::from),
        }
    }
}

/// Builds the Axum router
///
/// ```text
/// /
/// ├── GET  /health
/// └── POST /webhooks/telegram   # secret-checked
/// ```
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let webhook_routes = Router::new()
        .route("/telegram", post(routes::webhook::telegram_webhook))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            routes::webhook::require_secret,
        ));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/webhooks", webhook_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
