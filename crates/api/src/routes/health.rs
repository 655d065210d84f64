use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;
use tandem_db::repositories::JobRepo;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Whether the database is reachable.
    pub db_healthy: bool,
    /// Jobs waiting in the queue, or `null` when the database is down.
    pub queue_depth: Option<i64>,
}

/// GET /health -- returns service health and current queue depth.
///
/// The depth query doubles as the database probe: if it fails the
/// service reports `degraded` and no depth.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let queue_depth = match JobRepo::count_pending(&state.pool).await {
        Ok(depth) => Some(depth),
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not reach the database");
            None
        }
    };
    let db_healthy = queue_depth.is_some();

    let status = if db_healthy { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        queue_depth,
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
