//! Integration tests for the claim-and-execute loop, using stub executors
//! against a real queue.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use sqlx::PgPool;
use tandem_db::models::job::Job;
use tandem_db::models::status::JobStatus;
use tandem_db::repositories::JobRepo;
use tandem_worker::config::WorkerConfig;
use tandem_worker::executor::{Executor, ExecutorError};
use tandem_worker::runner::Runner;
use tandem_worker::snapshot::SNAPSHOT_FILE_NAME;

// ---------------------------------------------------------------------------
// Stub executors
// ---------------------------------------------------------------------------

struct SucceedWith(serde_json::Value);

#[async_trait]
impl Executor for SucceedWith {
    async fn execute(&self, _job: &Job) -> Result<serde_json::Value, ExecutorError> {
        Ok(self.0.clone())
    }
}

struct AlwaysRetryable;

#[async_trait]
impl Executor for AlwaysRetryable {
    async fn execute(&self, _job: &Job) -> Result<serde_json::Value, ExecutorError> {
        Err(ExecutorError::Retryable("transient outage".into()))
    }
}

struct AlwaysFatal;

#[async_trait]
impl Executor for AlwaysFatal {
    async fn execute(&self, _job: &Job) -> Result<serde_json::Value, ExecutorError> {
        Err(ExecutorError::Fatal("malformed payload".into()))
    }
}

/// Sleeps past any short execution budget before succeeding.
struct TooSlow;

#[async_trait]
impl Executor for TooSlow {
    async fn execute(&self, _job: &Job) -> Result<serde_json::Value, ExecutorError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(json!("never reached"))
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

fn test_config(jobs_root: &Path) -> WorkerConfig {
    WorkerConfig {
        poll_interval: Duration::from_millis(10),
        error_backoff: Duration::from_millis(10),
        execution_timeout: Duration::from_secs(30),
        max_attempts: 3,
        jobs_root: jobs_root.to_path_buf(),
        inference_url: "http://unused".into(),
    }
}

fn runner(pool: PgPool, executor: impl Executor + 'static, config: WorkerConfig) -> Runner {
    Runner::new(pool, Arc::new(executor), config)
}

async fn stored(pool: &PgPool, owner: &str, name: &str) -> Job {
    JobRepo::find_by_key(pool, owner, name)
        .await
        .unwrap()
        .unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn empty_queue_yields_none(pool: PgPool) {
    let tmp = tempfile::tempdir().unwrap();
    let runner = runner(pool, SucceedWith(json!("ok")), test_config(tmp.path()));

    assert!(runner.run_next_job().await.unwrap().is_none());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn success_finishes_job_and_writes_snapshot(pool: PgPool) {
    let tmp = tempfile::tempdir().unwrap();
    JobRepo::submit(&pool, "u1", "job-A", &json!({ "sav": ["X 1 A B"] }))
        .await
        .unwrap();

    let result = json!([["X 1 A B", 0.7, "Benign", 90.0]]);
    let runner = runner(
        pool.clone(),
        SucceedWith(result.clone()),
        test_config(tmp.path()),
    );

    let ran = runner.run_next_job().await.unwrap();
    assert!(ran.is_some());

    let job = stored(&pool, "u1", "job-A").await;
    assert_eq!(job.status_id, JobStatus::Finished.id());
    assert_eq!(job.result, Some(result));
    assert!(job.finished_at.is_some());

    let snapshot_path = tmp.path().join("u1/job-A").join(SNAPSHOT_FILE_NAME);
    let snapshot: serde_json::Value =
        serde_json::from_slice(&std::fs::read(snapshot_path).unwrap()).unwrap();
    assert_eq!(snapshot["status_id"], JobStatus::Finished.id());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn retryable_failure_requeues_job(pool: PgPool) {
    let tmp = tempfile::tempdir().unwrap();
    let payload = json!({ "sav": ["X 1 A B"] });
    JobRepo::submit(&pool, "u1", "job-A", &payload).await.unwrap();

    let runner = runner(pool.clone(), AlwaysRetryable, test_config(tmp.path()));
    runner.run_next_job().await.unwrap().unwrap();

    let job = stored(&pool, "u1", "job-A").await;
    assert_eq!(job.status_id, JobStatus::Pending.id());
    assert!(job.started_at.is_none());
    assert_eq!(job.payload, payload);
    assert_eq!(job.attempt_count, 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn fatal_failure_is_terminal(pool: PgPool) {
    let tmp = tempfile::tempdir().unwrap();
    JobRepo::submit(&pool, "u1", "job-A", &json!({})).await.unwrap();

    let runner = runner(pool.clone(), AlwaysFatal, test_config(tmp.path()));
    runner.run_next_job().await.unwrap().unwrap();

    let job = stored(&pool, "u1", "job-A").await;
    assert_eq!(job.status_id, JobStatus::Failed.id());
    assert_eq!(job.error_message.as_deref(), Some("malformed payload"));
    assert!(job.finished_at.is_some());

    // Failed jobs never re-enter the queue.
    assert!(runner.run_next_job().await.unwrap().is_none());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn retry_budget_exhaustion_fails_job(pool: PgPool) {
    let tmp = tempfile::tempdir().unwrap();
    JobRepo::submit(&pool, "u1", "job-A", &json!({})).await.unwrap();

    let runner = runner(pool.clone(), AlwaysRetryable, test_config(tmp.path()));

    // Attempts 1 and 2 roll back; attempt 3 exhausts the budget.
    for _ in 0..3 {
        runner.run_next_job().await.unwrap().unwrap();
    }

    let job = stored(&pool, "u1", "job-A").await;
    assert_eq!(job.status_id, JobStatus::Failed.id());
    assert_eq!(job.attempt_count, 3);
    let message = job.error_message.unwrap();
    assert!(message.contains("retry budget exhausted"), "{message}");
    assert!(message.contains("transient outage"), "{message}");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn execution_timeout_is_retryable(pool: PgPool) {
    let tmp = tempfile::tempdir().unwrap();
    JobRepo::submit(&pool, "u1", "job-A", &json!({})).await.unwrap();

    let mut config = test_config(tmp.path());
    config.execution_timeout = Duration::from_millis(50);

    let runner = runner(pool.clone(), TooSlow, config);
    runner.run_next_job().await.unwrap().unwrap();

    let job = stored(&pool, "u1", "job-A").await;
    assert_eq!(job.status_id, JobStatus::Pending.id());
    assert!(job.started_at.is_none());
    assert_eq!(job.attempt_count, 1);
}
