//! Best-effort audit snapshots.
//!
//! After every terminal transition the worker writes the final job
//! document to `{jobs_root}/{owner_id}/{job_name}/job.json`. The snapshot
//! is an operator convenience, not part of the correctness contract:
//! failures are logged and swallowed.

use std::fs;
use std::io;
use std::path::Path;

use tandem_core::artifact;
use tandem_db::models::job::Job;

/// File name of the audit snapshot inside a job directory.
pub const SNAPSHOT_FILE_NAME: &str = "job.json";

/// Write the job document into its job directory, creating it if needed.
pub fn write_snapshot(jobs_root: &Path, job: &Job) -> io::Result<()> {
    let dir = artifact::job_dir(jobs_root, &job.owner_id, &job.job_name);
    fs::create_dir_all(&dir)?;

    let body = serde_json::to_vec_pretty(job)?;
    fs::write(dir.join(SNAPSHOT_FILE_NAME), body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use tandem_db::models::status::JobStatus;

    fn sample_job() -> Job {
        Job {
            id: 1,
            owner_id: "u1".into(),
            job_name: "job-A".into(),
            status_id: JobStatus::Finished.id(),
            payload: json!({ "sav": ["X 1 A B"] }),
            result: Some(json!([["X 1 A B", 0.7, "Benign", 90.0]])),
            error_message: None,
            attempt_count: 1,
            submitted_at: Utc::now(),
            started_at: Some(Utc::now()),
            finished_at: Some(Utc::now()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn snapshot_lands_in_job_dir() {
        let tmp = tempfile::tempdir().unwrap();
        write_snapshot(tmp.path(), &sample_job()).unwrap();

        let path = tmp.path().join("u1/job-A").join(SNAPSHOT_FILE_NAME);
        let body: serde_json::Value =
            serde_json::from_slice(&fs::read(path).unwrap()).unwrap();
        assert_eq!(body["owner_id"], "u1");
        assert_eq!(body["status_id"], JobStatus::Finished.id());
    }

    #[test]
    fn snapshot_overwrites_previous_run() {
        let tmp = tempfile::tempdir().unwrap();
        let mut job = sample_job();
        write_snapshot(tmp.path(), &job).unwrap();

        job.attempt_count = 2;
        write_snapshot(tmp.path(), &job).unwrap();

        let path = tmp.path().join("u1/job-A").join(SNAPSHOT_FILE_NAME);
        let body: serde_json::Value =
            serde_json::from_slice(&fs::read(path).unwrap()).unwrap();
        assert_eq!(body["attempt_count"], 2);
    }
}
