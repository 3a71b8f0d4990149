//! Job record and run result formatting.

use super::to_pretty_json;
use crate::error::ApiError;
use crate::jobs::{JobOutcome, JobRecord, JobStatus};
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde_json::json;
use std::path::{Path, PathBuf};

fn status_label(status: JobStatus) -> String {
    match status {
        JobStatus::Completed => status.green().to_string(),
        JobStatus::Failed => status.red().to_string(),
        JobStatus::Processing => status.yellow().to_string(),
        JobStatus::Pending => status.dimmed().to_string(),
    }
}

/// Directory holding the artifacts persisted for this run, else `code_dir`.
pub fn artifact_dir(outcome: &JobOutcome, code_dir: &Path) -> PathBuf {
    outcome
        .state
        .execution
        .as_ref()
        .and_then(|e| e.artifact_path.as_deref())
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| code_dir.to_path_buf())
}

/// Terminal summary of a run, for both outcomes.
pub fn format_run_result_text(outcome: &JobOutcome, code_dir: &Path) -> String {
    let record = &outcome.record;
    let path = outcome
        .state
        .stage_path()
        .iter()
        .map(|s| s.name())
        .collect::<Vec<_>>()
        .join(" → ");
    let mut out = if outcome.state.is_success() {
        format!(
            "{} Animation ready: {}\n",
            "✓".green(),
            record.output_locator.as_deref().unwrap_or("-").bold()
        )
    } else {
        format!(
            "{} Animation failed: {}\n",
            "✗".red(),
            record.error.as_deref().unwrap_or("Unknown error")
        )
    };
    out.push_str(&format!("  prompt:      {}\n", record.prompt));
    out.push_str(&format!("  job:         {}\n", record.id));
    if let Some(locator) = &record.output_locator {
        out.push_str(&format!("  output:      {}\n", locator));
    }
    out.push_str(&format!(
        "  artifacts:   {}\n",
        artifact_dir(outcome, code_dir).display()
    ));
    out.push_str(&format!("  corrections: {}\n", outcome.state.attempts));
    out.push_str(&format!("  stages:      {}", path));
    out
}

pub fn format_run_result_json(outcome: &JobOutcome, code_dir: &Path) -> Result<String, ApiError> {
    let stages: Vec<&str> = outcome
        .state
        .stage_path()
        .iter()
        .map(|s| s.name())
        .collect();
    to_pretty_json(&json!({
        "success": outcome.state.is_success(),
        "prompt": outcome.record.prompt,
        "output": outcome.record.output_locator,
        "artifact_dir": artifact_dir(outcome, code_dir),
        "job": outcome.record,
        "attempts": outcome.state.attempts,
        "stages": stages,
        "failure": outcome.state.failure,
    }))
}

pub fn format_job_text(record: &JobRecord) -> String {
    let mut out = format!("Job {}\n", record.id.bold());
    out.push_str(&format!("  status:    {}\n", status_label(record.status)));
    out.push_str(&format!("  prompt:    {}\n", record.prompt));
    out.push_str(&format!("  level:     {}\n", record.level));
    out.push_str(&format!("  quality:   {}\n", record.quality));
    out.push_str(&format!(
        "  created:   {}\n",
        record.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if let Some(done) = record.completed_at {
        out.push_str(&format!(
            "  completed: {}\n",
            done.format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }
    if let Some(locator) = &record.output_locator {
        out.push_str(&format!("  output:    {}\n", locator));
    }
    if let Some(error) = &record.error {
        out.push_str(&format!("  error:     {}\n", error.red()));
    }
    out.trim_end().to_string()
}

pub fn format_job_json(record: &JobRecord) -> Result<String, ApiError> {
    to_pretty_json(&json!(record))
}

pub fn format_job_list_text(records: &[JobRecord]) -> String {
    if records.is_empty() {
        return "No jobs recorded.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Job", "Status", "Created", "Prompt", "Output / Error"]);
    for r in records {
        let detail = r
            .output_locator
            .clone()
            .or_else(|| r.error.clone())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            r.id.clone(),
            r.status.to_string(),
            r.created_at.format("%Y-%m-%d %H:%M").to_string(),
            crate::logging::truncate_for_display(&r.prompt, 40),
            crate::logging::truncate_for_display(&detail, 60),
        ]);
    }
    table.to_string()
}

pub fn format_job_list_json(records: &[JobRecord]) -> Result<String, ApiError> {
    to_pretty_json(&json!(records))
}
