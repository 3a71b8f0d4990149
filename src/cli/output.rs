//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::{ApiError, StorageError};
use owo_colors::OwoColorize;

/// Map domain/service errors to a string for CLI output.
pub fn map_error(e: &ApiError) -> String {
    match e {
        ApiError::JobFailed {
            job_id,
            message,
            summary,
        } => {
            if summary.is_empty() {
                format!("{} {}\n  job: {}", "✗".red(), message, job_id.dimmed())
            } else {
                summary.clone()
            }
        }
        ApiError::JobNotFound(id) | ApiError::StorageError(StorageError::JobNotFound(id)) => {
            format!("{} No job with id {}", "✗".red(), id)
        }
        ApiError::ConfigError(msg) => format!("{} Configuration error: {}", "✗".red(), msg),
        other => format!("{} {}", "✗".red(), other),
    }
}
