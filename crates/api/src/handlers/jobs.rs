//! Handlers for the `/jobs` resource: submission and the polling read path.
//!
//! Polling is deliberately cheap and always answers 200: an unknown key is
//! a "not_found" view, not an HTTP error, because clients may start
//! polling before their submission lands. Each view carries the suggested
//! interval until the next poll; terminal views carry `null` to tell the
//! client to stop.

use std::path::PathBuf;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use tandem_core::artifact;
use tandem_core::error::CoreError;
use tandem_core::job_name;
use tandem_core::polling::{next_poll_secs, PollPhase};
use tandem_core::types::Timestamp;
use tandem_db::models::job::{Job, JobListQuery, SubmitJob};
use tandem_db::models::status::JobStatus;
use tandem_db::repositories::JobRepo;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /api/v1/jobs
///
/// Submit a new job. Returns 201 with the created document, 409
/// `DUPLICATE_JOB` if the `(owner_id, job_name)` key is taken. When
/// `job_name` is omitted the server derives one from the submission time.
pub async fn submit_job(
    State(state): State<AppState>,
    Json(input): Json<SubmitJob>,
) -> AppResult<impl IntoResponse> {
    let owner_id = input.owner_id.trim().to_string();
    // The owner ID is the other half of the artifact directory key, so it
    // is held to the same rules as the job name.
    job_name::validate_owner_id(&owner_id)?;

    let name = match input.job_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => {
            job_name::validate_job_name(name)?;
            name.to_string()
        }
        _ => job_name::generate_job_name(),
    };

    let job = JobRepo::submit(&state.pool, &owner_id, &name, &input.payload)
        .await
        .map_err(|e| {
            if JobRepo::is_duplicate_key(&e) {
                AppError::Core(CoreError::DuplicateJob {
                    owner_id: owner_id.clone(),
                    job_name: name.clone(),
                })
            } else {
                AppError::Database(e)
            }
        })?;

    tracing::info!(
        job_id = job.id,
        owner_id = %job.owner_id,
        job_name = %job.job_name,
        "Job submitted",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: job })))
}

// ---------------------------------------------------------------------------
// Poll
// ---------------------------------------------------------------------------

/// Client-facing view of a polled job. Serialized with a `status` tag so
/// clients can switch on one field.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobView {
    NotFound {
        next_poll_secs: Option<u64>,
    },
    Pending {
        next_poll_secs: Option<u64>,
    },
    Processing {
        elapsed_secs: i64,
        next_poll_secs: Option<u64>,
    },
    Finished {
        result: Option<serde_json::Value>,
        runtime_secs: Option<i64>,
        archive: Option<String>,
        next_poll_secs: Option<u64>,
    },
    Failed {
        error: String,
        runtime_secs: Option<i64>,
        next_poll_secs: Option<u64>,
    },
}

/// GET /api/v1/jobs/{owner_id}/{job_name}
///
/// Read-only except for one side effect: the first poll that observes a
/// finished job triggers result packaging (idempotent, so concurrent
/// pollers at worst race to create the same archive once).
pub async fn poll_job(
    State(state): State<AppState>,
    Path((owner_id, name)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    let job = JobRepo::find_by_key(&state.pool, &owner_id, &name).await?;

    let archive = match &job {
        Some(job) if job.status_id == JobStatus::Finished.id() => {
            package_results(&state, &owner_id, &name).await
        }
        _ => None,
    };

    let view = build_view(job.as_ref(), archive, Utc::now());
    Ok(Json(DataResponse { data: view }))
}

/// Build the polled view of a job document as of `now`.
fn build_view(job: Option<&Job>, archive: Option<PathBuf>, now: Timestamp) -> JobView {
    let Some(job) = job else {
        return JobView::NotFound {
            next_poll_secs: next_poll_secs(PollPhase::NotFound),
        };
    };

    let runtime_secs = match (job.started_at, job.finished_at) {
        (Some(start), Some(end)) => Some((end - start).num_seconds()),
        _ => None,
    };

    match JobStatus::from_id(job.status_id) {
        Some(JobStatus::Pending) | None => JobView::Pending {
            next_poll_secs: next_poll_secs(PollPhase::Pending),
        },
        Some(JobStatus::Processing) => {
            let elapsed_secs = job
                .started_at
                .map(|start| (now - start).num_seconds().max(0))
                .unwrap_or(0);
            JobView::Processing {
                elapsed_secs,
                next_poll_secs: next_poll_secs(PollPhase::Processing),
            }
        }
        Some(JobStatus::Finished) => JobView::Finished {
            result: job.result.clone(),
            runtime_secs,
            archive: archive.map(|p| p.display().to_string()),
            next_poll_secs: next_poll_secs(PollPhase::Terminal),
        },
        Some(JobStatus::Failed) => JobView::Failed {
            error: job
                .error_message
                .clone()
                .unwrap_or_else(|| "execution failed".to_string()),
            runtime_secs,
            next_poll_secs: next_poll_secs(PollPhase::Terminal),
        },
    }
}

/// Ensure the finished job's output directory is bundled into its archive.
///
/// Packaging runs on the blocking pool (zip encoding is CPU and file I/O).
/// A missing job directory just means the executor produced no files;
/// that is not an error, the view simply carries no archive.
async fn package_results(state: &AppState, owner_id: &str, job_name: &str) -> Option<PathBuf> {
    let dir = artifact::job_dir(&state.config.jobs_root, owner_id, job_name);

    let packaged = tokio::task::spawn_blocking(move || artifact::package(&dir)).await;
    match packaged {
        Ok(Ok(path)) => Some(path),
        Ok(Err(artifact::ArtifactError::MissingJobDir(dir))) => {
            tracing::debug!(job_dir = %dir.display(), "No output directory to package");
            None
        }
        Ok(Err(e)) => {
            tracing::error!(owner_id, job_name, error = %e, "Result packaging failed");
            None
        }
        Err(e) => {
            tracing::error!(owner_id, job_name, error = %e, "Result packaging task failed");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

/// GET /api/v1/jobs?owner_id=...
///
/// List an owner's submitted jobs, newest first. Lets a returning session
/// rediscover its job names before polling them.
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(params): Query<JobListQuery>,
) -> AppResult<impl IntoResponse> {
    if params.owner_id.trim().is_empty() {
        return Err(AppError::BadRequest("owner_id must not be empty".into()));
    }

    let jobs = JobRepo::list_by_owner(&state.pool, &params).await?;
    Ok(Json(DataResponse { data: jobs }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn job_with_status(status: JobStatus) -> Job {
        let now = Utc::now();
        Job {
            id: 1,
            owner_id: "u1".into(),
            job_name: "job-A".into(),
            status_id: status.id(),
            payload: json!({}),
            result: None,
            error_message: None,
            attempt_count: 0,
            submitted_at: now,
            started_at: None,
            finished_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn missing_job_views_as_not_found() {
        let view = build_view(None, None, Utc::now());
        let json = serde_json::to_value(view).unwrap();
        assert_eq!(json["status"], "not_found");
        assert_eq!(json["next_poll_secs"], 10);
    }

    #[test]
    fn pending_view_suggests_slow_polling() {
        let job = job_with_status(JobStatus::Pending);
        let json = serde_json::to_value(build_view(Some(&job), None, Utc::now())).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["next_poll_secs"], 3);
    }

    #[test]
    fn processing_view_carries_elapsed_time() {
        let now = Utc::now();
        let mut job = job_with_status(JobStatus::Processing);
        job.started_at = Some(now - Duration::seconds(42));

        let json = serde_json::to_value(build_view(Some(&job), None, now)).unwrap();
        assert_eq!(json["status"], "processing");
        assert_eq!(json["elapsed_secs"], 42);
        assert_eq!(json["next_poll_secs"], 1);
    }

    #[test]
    fn finished_view_is_stable_and_stops_polling() {
        let now = Utc::now();
        let mut job = job_with_status(JobStatus::Finished);
        job.started_at = Some(now - Duration::seconds(90));
        job.finished_at = Some(now - Duration::seconds(30));
        job.result = Some(json!([["X 1 A B", 0.7, "Benign", 90.0]]));

        let first = serde_json::to_value(build_view(Some(&job), None, now)).unwrap();
        let later = serde_json::to_value(build_view(
            Some(&job),
            None,
            now + Duration::seconds(600),
        ))
        .unwrap();

        assert_eq!(first["status"], "finished");
        assert_eq!(first["runtime_secs"], 60);
        assert_eq!(first["next_poll_secs"], serde_json::Value::Null);
        // Repeated polls of a terminal job return the identical view.
        assert_eq!(first, later);
    }

    #[test]
    fn failed_view_surfaces_the_error() {
        let now = Utc::now();
        let mut job = job_with_status(JobStatus::Failed);
        job.started_at = Some(now - Duration::seconds(10));
        job.finished_at = Some(now);
        job.error_message = Some("retry budget exhausted after 3 attempts".into());

        let json = serde_json::to_value(build_view(Some(&job), None, now)).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(
            json["error"],
            "retry budget exhausted after 3 attempts"
        );
        assert_eq!(json["next_poll_secs"], serde_json::Value::Null);
    }
}
