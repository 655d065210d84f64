//! Job key validation and name generation.
//!
//! A job is keyed by `(owner_id, job_name)`, and both halves of the key
//! become directory components of the job's artifact path, so both are
//! held to the same charset allow-list. Callers may pick their own job
//! name; when they leave it blank the server derives one from the
//! submission time so repeated submissions in the same session never clash
//! at second granularity.

use chrono::Utc;

use crate::error::CoreError;

/// Maximum length of a key component.
const MAX_NAME_LEN: usize = 128;

/// Format used for generated job names, e.g. `2026-08-28_14-03-59`.
const GENERATED_NAME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Validate one component of the job key after trimming.
///
/// Rules:
/// - Must not be empty after trimming.
/// - Must not exceed `MAX_NAME_LEN` characters.
/// - Must contain only alphanumeric, hyphen, underscore, or dot characters.
/// - Must not be `.` or `..`.
///
/// The restrictions exist because the value becomes a directory component
/// under the jobs root; anything that could resolve outside its own
/// directory (separators, traversal segments) is rejected.
fn validate_key_component(value: &str, what: &str) -> Result<(), CoreError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CoreError::Validation(format!("{what} must not be empty")));
    }
    if value.len() > MAX_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "{what} must not exceed {MAX_NAME_LEN} characters"
        )));
    }
    if !value
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(CoreError::Validation(format!(
            "{what} may only contain alphanumeric, hyphen, underscore, or dot characters"
        )));
    }
    if value == "." || value == ".." {
        return Err(CoreError::Validation(format!(
            "{what} must not be a relative path segment"
        )));
    }
    Ok(())
}

/// Validate a job name after trimming.
pub fn validate_job_name(name: &str) -> Result<(), CoreError> {
    validate_key_component(name, "Job name")
}

/// Validate an owner ID after trimming.
pub fn validate_owner_id(owner_id: &str) -> Result<(), CoreError> {
    validate_key_component(owner_id, "Owner ID")
}

/// Generate a timestamp-derived job name from the current UTC time.
pub fn generate_job_name() -> String {
    Utc::now().format(GENERATED_NAME_FORMAT).to_string()
}
