//! Repository for the `jobs` table.
//!
//! All status mutation goes through this module as single-statement
//! conditional updates scoped to one row. There are no cross-job locks and
//! no multi-job transactions; the claim statement is the only place where
//! two workers can contend, and `FOR UPDATE SKIP LOCKED` resolves that
//! race inside the database.

use sqlx::PgPool;
use tandem_core::types::DbId;

use crate::models::job::{Job, JobListQuery};
use crate::models::status::JobStatus;

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, owner_id, job_name, status_id, payload, result, error_message, \
    attempt_count, submitted_at, started_at, finished_at, \
    created_at, updated_at";

/// Maximum page size for job listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for job listing.
const DEFAULT_LIMIT: i64 = 50;

/// Unique constraint guarding `(owner_id, job_name)`.
const UNIQUE_KEY_CONSTRAINT: &str = "uq_jobs_owner_name";

/// Provides the queue operations for background jobs.
pub struct JobRepo;

impl JobRepo {
    /// Insert a new pending job and return the stored row.
    ///
    /// A duplicate `(owner_id, job_name)` violates `uq_jobs_owner_name`
    /// and surfaces as a database error; use [`JobRepo::is_duplicate_key`]
    /// to recognize it. Relying on the constraint instead of a prior
    /// SELECT keeps check-and-insert race-free.
    pub async fn submit(
        pool: &PgPool,
        owner_id: &str,
        job_name: &str,
        payload: &serde_json::Value,
    ) -> Result<Job, sqlx::Error> {
        let query = format!(
            "INSERT INTO jobs (owner_id, job_name, status_id, payload) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(owner_id)
            .bind(job_name)
            .bind(JobStatus::Pending.id())
            .bind(payload)
            .fetch_one(pool)
            .await
    }

    /// Whether an error is the unique-key violation raised by a duplicate
    /// `(owner_id, job_name)` submission.
    pub fn is_duplicate_key(err: &sqlx::Error) -> bool {
        match err {
            sqlx::Error::Database(db_err) => {
                // PostgreSQL unique constraint violation: error code 23505.
                db_err.code().as_deref() == Some("23505")
                    && db_err.constraint() == Some(UNIQUE_KEY_CONSTRAINT)
            }
            _ => false,
        }
    }

    /// Atomically claim the oldest pending job.
    ///
    /// A single statement selects the FIFO head (`ORDER BY submitted_at`)
    /// with `FOR UPDATE SKIP LOCKED`, flips it to `processing`, stamps
    /// `started_at`, and increments `attempt_count`. No two concurrent
    /// workers can claim the same row; this is the one correctness-critical
    /// primitive of the whole queue, so it must never be split into a read
    /// followed by a write.
    ///
    /// Returns the claimed row (payload included) or `None` when the queue
    /// is empty.
    pub async fn claim_next(pool: &PgPool) -> Result<Option<Job>, sqlx::Error> {
        let query = format!(
            "UPDATE jobs \
             SET status_id = $1, started_at = NOW(), \
                 attempt_count = attempt_count + 1, updated_at = NOW() \
             WHERE id = ( \
                 SELECT id FROM jobs \
                 WHERE status_id = $2 \
                 ORDER BY submitted_at ASC, id ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(JobStatus::Processing.id())
            .bind(JobStatus::Pending.id())
            .fetch_optional(pool)
            .await
    }

    /// Mark a processing job as finished with its result payload.
    pub async fn complete(
        pool: &PgPool,
        job_id: DbId,
        result: &serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE jobs \
             SET status_id = $2, result = $3, finished_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status_id = $4",
        )
        .bind(job_id)
        .bind(JobStatus::Finished.id())
        .bind(result)
        .bind(JobStatus::Processing.id())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Roll a processing job back to the queue after a recoverable failure.
    ///
    /// Clears `started_at` so the next claim stamps a fresh processing
    /// episode; the payload and `attempt_count` are untouched, and the job
    /// re-enters the FIFO at its original `submitted_at` position.
    pub async fn release(pool: &PgPool, job_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE jobs \
             SET status_id = $2, started_at = NULL, updated_at = NOW() \
             WHERE id = $1 AND status_id = $3",
        )
        .bind(job_id)
        .bind(JobStatus::Pending.id())
        .bind(JobStatus::Processing.id())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Mark a processing job as terminally failed.
    ///
    /// Used for non-retryable executor errors and for jobs that exhaust
    /// their retry budget. `started_at` is kept so the failure's runtime
    /// remains observable.
    pub async fn fail(
        pool: &PgPool,
        job_id: DbId,
        error: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE jobs \
             SET status_id = $2, error_message = $3, finished_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status_id = $4",
        )
        .bind(job_id)
        .bind(JobStatus::Failed.id())
        .bind(error)
        .bind(JobStatus::Processing.id())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Number of jobs currently waiting in the queue.
    pub async fn count_pending(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM jobs WHERE status_id = $1")
                .bind(JobStatus::Pending.id())
                .fetch_one(pool)
                .await?;
        Ok(count)
    }

    /// Find a job by its `(owner_id, job_name)` key.
    pub async fn find_by_key(
        pool: &PgPool,
        owner_id: &str,
        job_name: &str,
    ) -> Result<Option<Job>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM jobs WHERE owner_id = $1 AND job_name = $2"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(owner_id)
            .bind(job_name)
            .fetch_optional(pool)
            .await
    }

    /// List an owner's jobs, newest first, with optional status filter
    /// and pagination.
    pub async fn list_by_owner(
        pool: &PgPool,
        params: &JobListQuery,
    ) -> Result<Vec<Job>, sqlx::Error> {
        // Postgres rejects negative LIMIT/OFFSET, so clamp both ends.
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(0, MAX_LIMIT);
        let offset = params.offset.unwrap_or(0).max(0);

        let (filter, query) = match params.status_id {
            Some(_) => (
                true,
                format!(
                    "SELECT {COLUMNS} FROM jobs \
                     WHERE owner_id = $1 AND status_id = $2 \
                     ORDER BY submitted_at DESC, id DESC \
                     LIMIT $3 OFFSET $4"
                ),
            ),
            None => (
                false,
                format!(
                    "SELECT {COLUMNS} FROM jobs \
                     WHERE owner_id = $1 \
                     ORDER BY submitted_at DESC, id DESC \
                     LIMIT $2 OFFSET $3"
                ),
            ),
        };

        let mut q = sqlx::query_as::<_, Job>(&query).bind(&params.owner_id);
        if filter {
            q = q.bind(params.status_id);
        }
        q.bind(limit).bind(offset).fetch_all(pool).await
    }
}
