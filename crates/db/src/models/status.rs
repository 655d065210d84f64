//! Job status enum mapping to the SMALLINT `status_id` column.
//!
//! The discriminants match the values documented in the `jobs` migration.

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

/// Job execution status.
///
/// Valid transitions:
///
/// ```text
/// Pending -> Processing -> Finished
///     ^           |
///     +-- retry --+--------> Failed
/// ```
///
/// `Finished` and `Failed` are terminal. The only backward edge is the
/// retry rollback from `Processing` to `Pending` after a recoverable
/// executor failure.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending = 1,
    Processing = 2,
    Finished = 3,
    Failed = 4,
}

impl JobStatus {
    /// Return the database status ID.
    pub fn id(self) -> StatusId {
        self as StatusId
    }

    /// Whether no further transition can leave this status.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Finished | JobStatus::Failed)
    }

    /// Map a raw `status_id` column value back to the enum.
    pub fn from_id(id: StatusId) -> Option<Self> {
        match id {
            1 => Some(JobStatus::Pending),
            2 => Some(JobStatus::Processing),
            3 => Some(JobStatus::Finished),
            4 => Some(JobStatus::Failed),
            _ => None,
        }
    }
}

impl From<JobStatus> for StatusId {
    fn from(value: JobStatus) -> Self {
        value as StatusId
    }
}
