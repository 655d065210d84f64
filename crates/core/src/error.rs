#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Job already exists: {owner_id}/{job_name}")]
    DuplicateJob { owner_id: String, job_name: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
