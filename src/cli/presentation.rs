//! CLI presentation: text and json formatters per command family.

mod check;
mod jobs;

pub use check::{format_check_report_json, format_check_report_text};
pub use jobs::{
    format_job_list_json, format_job_list_text, format_job_json, format_job_text,
    format_run_result_json, format_run_result_text,
};

use crate::error::ApiError;

fn to_pretty_json(value: &serde_json::Value) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value).map_err(|e| ApiError::Io(e.into()))
}
