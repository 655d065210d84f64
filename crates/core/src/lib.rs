//! Domain logic shared by the API server and the worker.
//!
//! This crate has no internal dependencies and no database access. It holds
//! the error taxonomy, job-name rules, the client polling cadence, and the
//! result archive packager.

pub mod artifact;
pub mod error;
pub mod job_name;
pub mod polling;
pub mod types;
