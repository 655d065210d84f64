//! The claim-and-execute loop.
//!
//! One iteration: claim the FIFO head, run the executor against its
//! payload, then record the outcome as a terminal transition or a rollback.
//! Claims happen through a single atomic statement, so any number of
//! runner processes can share one queue.

use std::sync::Arc;

use sqlx::PgPool;
use tandem_core::types::DbId;
use tandem_db::repositories::JobRepo;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::config::WorkerConfig;
use crate::executor::{Executor, ExecutorError};
use crate::snapshot;

pub struct Runner {
    pool: PgPool,
    executor: Arc<dyn Executor>,
    config: WorkerConfig,
}

impl Runner {
    pub fn new(pool: PgPool, executor: Arc<dyn Executor>, config: WorkerConfig) -> Self {
        Self {
            pool,
            executor,
            config,
        }
    }

    /// Run until the cancellation token is triggered.
    ///
    /// Cancellation is only observed between jobs: a claimed job always
    /// runs to its outcome, so shutdown never strands a row in
    /// `processing`.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            max_attempts = self.config.max_attempts,
            "Worker started",
        );

        loop {
            if cancel.is_cancelled() {
                tracing::info!("Worker shutting down");
                break;
            }

            match self.run_next_job().await {
                Ok(Some(_)) => {
                    // More work may be waiting; claim again immediately.
                }
                Ok(None) => {
                    tokio::select! {
                        _ = cancel.cancelled() => {}
                        _ = sleep(self.config.poll_interval) => {}
                    }
                }
                Err(e) => {
                    // Store unreachable. Back off and retry the iteration
                    // rather than crash the loop.
                    tracing::error!(error = %e, "Queue iteration failed");
                    tokio::select! {
                        _ = cancel.cancelled() => {}
                        _ = sleep(self.config.error_backoff) => {}
                    }
                }
            }
        }
    }

    /// Claim and execute one job, if any is pending.
    ///
    /// Returns:
    /// - `Ok(Some(job_id))` if a job was claimed and handled
    /// - `Ok(None)` if the queue was empty
    /// - `Err(...)` if the store could not be reached
    pub async fn run_next_job(&self) -> Result<Option<DbId>, sqlx::Error> {
        let Some(job) = JobRepo::claim_next(&self.pool).await? else {
            return Ok(None);
        };

        tracing::info!(
            job_id = job.id,
            owner_id = %job.owner_id,
            job_name = %job.job_name,
            attempt = job.attempt_count,
            "Job claimed",
        );

        let outcome =
            tokio::time::timeout(self.config.execution_timeout, self.executor.execute(&job))
                .await
                .unwrap_or_else(|_| {
                    Err(ExecutorError::Retryable(format!(
                        "execution exceeded {}s budget",
                        self.config.execution_timeout.as_secs()
                    )))
                });

        match outcome {
            Ok(result) => {
                JobRepo::complete(&self.pool, job.id, &result).await?;
                tracing::info!(job_id = job.id, "Job finished");
                self.write_audit_snapshot(&job.owner_id, &job.job_name).await;
            }
            Err(ExecutorError::Fatal(msg)) => {
                JobRepo::fail(&self.pool, job.id, &msg).await?;
                tracing::warn!(job_id = job.id, error = %msg, "Job failed (fatal)");
                self.write_audit_snapshot(&job.owner_id, &job.job_name).await;
            }
            Err(ExecutorError::Retryable(msg)) => {
                if job.attempt_count >= self.config.max_attempts {
                    let terminal = format!(
                        "retry budget exhausted after {} attempts; last error: {msg}",
                        job.attempt_count
                    );
                    JobRepo::fail(&self.pool, job.id, &terminal).await?;
                    tracing::warn!(
                        job_id = job.id,
                        attempts = job.attempt_count,
                        error = %msg,
                        "Job failed (retries exhausted)",
                    );
                    self.write_audit_snapshot(&job.owner_id, &job.job_name).await;
                } else {
                    JobRepo::release(&self.pool, job.id).await?;
                    tracing::warn!(
                        job_id = job.id,
                        attempt = job.attempt_count,
                        error = %msg,
                        "Job released back to queue",
                    );
                }
            }
        }

        Ok(Some(job.id))
    }

    /// Persist the final job document next to its output files.
    /// Best-effort only; never propagates an error.
    async fn write_audit_snapshot(&self, owner_id: &str, job_name: &str) {
        let row = match JobRepo::find_by_key(&self.pool, owner_id, job_name).await {
            Ok(Some(job)) => job,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(error = %e, "Audit snapshot read failed");
                return;
            }
        };

        let jobs_root = self.config.jobs_root.clone();
        let result = tokio::task::spawn_blocking(move || {
            snapshot::write_snapshot(&jobs_root, &row)
        })
        .await;

        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(owner_id, job_name, error = %e, "Audit snapshot write failed")
            }
            Err(e) => {
                tracing::warn!(owner_id, job_name, error = %e, "Audit snapshot task failed")
            }
        }
    }
}
