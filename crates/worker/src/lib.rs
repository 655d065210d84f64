//! The claim-and-execute worker.
//!
//! Each worker process runs one sequential loop: atomically claim the
//! oldest pending job, hand its payload to the [`executor::Executor`], and
//! record the outcome. Scale-out is achieved by running more worker
//! processes against the same database; the claim statement guarantees no
//! job is ever executed by two workers at once.

pub mod config;
pub mod executor;
pub mod runner;
pub mod snapshot;
