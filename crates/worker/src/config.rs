use std::path::PathBuf;
use std::time::Duration;

/// Worker configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// How long to sleep when the queue is empty (default: 2s).
    pub poll_interval: Duration,
    /// How long to back off after a database error (default: 5s).
    pub error_backoff: Duration,
    /// Wall-clock budget for one executor invocation (default: 3600s).
    /// A timeout counts as a retryable failure.
    pub execution_timeout: Duration,
    /// Claims before a retryable failure becomes terminal (default: 3).
    pub max_attempts: i32,
    /// Root directory for per-job output and audit snapshots.
    pub jobs_root: PathBuf,
    /// Base URL of the inference service the default executor posts to.
    pub inference_url: String,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                 |
    /// |--------------------------|-------------------------|
    /// | `POLL_INTERVAL_SECS`     | `2`                     |
    /// | `ERROR_BACKOFF_SECS`     | `5`                     |
    /// | `EXECUTION_TIMEOUT_SECS` | `3600`                  |
    /// | `MAX_ATTEMPTS`           | `3`                     |
    /// | `JOBS_ROOT`              | `./jobs`                |
    /// | `INFERENCE_URL`          | `http://inference:5000` |
    pub fn from_env() -> Self {
        let poll_interval_secs: u64 = std::env::var("POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| "2".into())
            .parse()
            .expect("POLL_INTERVAL_SECS must be a valid u64");

        let error_backoff_secs: u64 = std::env::var("ERROR_BACKOFF_SECS")
            .unwrap_or_else(|_| "5".into())
            .parse()
            .expect("ERROR_BACKOFF_SECS must be a valid u64");

        let execution_timeout_secs: u64 = std::env::var("EXECUTION_TIMEOUT_SECS")
            .unwrap_or_else(|_| "3600".into())
            .parse()
            .expect("EXECUTION_TIMEOUT_SECS must be a valid u64");

        let max_attempts: i32 = std::env::var("MAX_ATTEMPTS")
            .unwrap_or_else(|_| "3".into())
            .parse()
            .expect("MAX_ATTEMPTS must be a valid i32");

        let jobs_root =
            PathBuf::from(std::env::var("JOBS_ROOT").unwrap_or_else(|_| "./jobs".into()));

        let inference_url = std::env::var("INFERENCE_URL")
            .unwrap_or_else(|_| "http://inference:5000".into());

        Self {
            poll_interval: Duration::from_secs(poll_interval_secs),
            error_backoff: Duration::from_secs(error_backoff_secs),
            execution_timeout: Duration::from_secs(execution_timeout_secs),
            max_attempts,
            jobs_root,
            inference_url,
        }
    }
}
