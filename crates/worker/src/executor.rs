//! The executor seam between the orchestrator and the domain.
//!
//! The worker does not know what a job means; it hands the opaque payload
//! to an [`Executor`] and stores whatever comes back. Execution is
//! at-least-once: a worker that crashes mid-run leaves the job to be
//! claimed again, so executors must be idempotent with respect to the job
//! key or accept duplicate side effects.

use async_trait::async_trait;
use tandem_db::models::job::Job;

/// Outcome classification for a failed execution.
///
/// `Retryable` rolls the job back to the queue (until the retry budget
/// runs out); `Fatal` fails it immediately.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("Retryable executor failure: {0}")]
    Retryable(String),

    #[error("Fatal executor failure: {0}")]
    Fatal(String),
}

/// Domain logic invoked once per claimed job.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Execute the job's payload and return the opaque result document.
    async fn execute(&self, job: &Job) -> Result<serde_json::Value, ExecutorError>;
}

/// Executor that POSTs the job payload to an inference HTTP service.
///
/// The service contract: `POST {base}/infer` with the payload as the JSON
/// body, responding `{ "output": <result> }`. Connection errors and 5xx
/// responses are retryable (the service may be restarting); 4xx responses
/// mean the payload itself is bad and will never succeed.
pub struct HttpExecutor {
    client: reqwest::Client,
    infer_url: String,
}

impl HttpExecutor {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            infer_url: format!("{}/infer", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl Executor for HttpExecutor {
    async fn execute(&self, job: &Job) -> Result<serde_json::Value, ExecutorError> {
        let response = self
            .client
            .post(&self.infer_url)
            .json(&job.payload)
            .send()
            .await
            .map_err(|e| ExecutorError::Retryable(format!("inference unreachable: {e}")))?;

        let status = response.status();
        if status.is_client_error() {
            return Err(ExecutorError::Fatal(format!(
                "inference rejected payload: HTTP {status}"
            )));
        }
        if !status.is_success() {
            return Err(ExecutorError::Retryable(format!(
                "inference returned HTTP {status}"
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ExecutorError::Retryable(format!("invalid inference reply: {e}")))?;

        body.get("output")
            .cloned()
            .ok_or_else(|| {
                ExecutorError::Fatal("inference reply missing 'output' field".to_string())
            })
    }
}
