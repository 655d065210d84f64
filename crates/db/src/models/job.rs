//! Job entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tandem_core::types::{DbId, Timestamp};

use super::status::StatusId;

/// A row from the `jobs` table.
///
/// `payload` and `result` are opaque to the orchestrator; their schema is
/// owned by the submitting client and the executor respectively.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Job {
    pub id: DbId,
    pub owner_id: String,
    pub job_name: String,
    pub status_id: StatusId,
    pub payload: serde_json::Value,
    pub result: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub attempt_count: i32,
    pub submitted_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub finished_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for submitting a new job via `POST /api/v1/jobs`.
#[derive(Debug, Deserialize)]
pub struct SubmitJob {
    pub owner_id: String,
    /// Optional; a timestamp-derived name is generated when absent.
    pub job_name: Option<String>,
    pub payload: serde_json::Value,
}

/// Query parameters for `GET /api/v1/jobs`.
#[derive(Debug, Deserialize)]
pub struct JobListQuery {
    pub owner_id: String,
    /// Filter by status ID (e.g. 1 = pending, 3 = finished).
    pub status_id: Option<StatusId>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}
