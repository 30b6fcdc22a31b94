/// Health check endpoint
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected",
///   "access_mode": "open",
///   "active_sessions": 0
/// }
/// ```
///
/// Always answers 200; an unreachable store only downgrades `status`.

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use taskbot_shared::auth::AccessMode;
use taskbot_shared::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Healthy,
    Degraded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseStatus {
    Connected,
    Disconnected,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ServiceStatus,
    pub version: String,
    pub database: DatabaseStatus,
    pub access_mode: AccessMode,

    /// Create-task wizards currently in progress
    pub active_sessions: usize,
}

pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let (status, database) = match state.store.ping().await {
        Ok(()) => (ServiceStatus::Healthy, DatabaseStatus::Connected),
        Err(e) => {
            tracing::warn!(error = %e, "Health check: store unreachable");
            (ServiceStatus::Degraded, DatabaseStatus::Disconnected)
        }
    };

    Ok(Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
        access_mode: state.dispatcher.access_mode(),
        active_sessions: state.dispatcher.sessions().len(),
    }))
}
