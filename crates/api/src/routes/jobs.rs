//! Route definitions for the `/jobs` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// Routes mounted at `/jobs`.
///
/// ```text
/// GET    /                        -> list_jobs
/// POST   /                        -> submit_job
/// GET    /{owner_id}/{job_name}   -> poll_job
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(jobs::list_jobs).post(jobs::submit_job))
        .route("/{owner_id}/{job_name}", get(jobs::poll_job))
}
