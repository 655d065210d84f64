//! Client polling cadence.
//!
//! The status endpoint tells the client how long to wait before asking
//! again. A queued job cannot make visible progress, so the suggested
//! interval is long; a running job updates its elapsed time every second;
//! a terminal job returns `None`, the stop-polling signal. Clients must
//! tolerate the interval changing between polls.

/// Suggested interval when no job exists yet for the polled key.
pub const NOT_FOUND_POLL_SECS: u64 = 10;

/// Suggested interval while the job waits in the queue.
pub const PENDING_POLL_SECS: u64 = 3;

/// Suggested interval while the job is executing.
pub const PROCESSING_POLL_SECS: u64 = 1;

/// Client-observable phase of a polled job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    NotFound,
    Pending,
    Processing,
    Terminal,
}

/// Suggested seconds until the next poll, or `None` to stop polling.
pub fn next_poll_secs(phase: PollPhase) -> Option<u64> {
    match phase {
        PollPhase::NotFound => Some(NOT_FOUND_POLL_SECS),
        PollPhase::Pending => Some(PENDING_POLL_SECS),
        PollPhase::Processing => Some(PROCESSING_POLL_SECS),
        PollPhase::Terminal => None,
    }
}
