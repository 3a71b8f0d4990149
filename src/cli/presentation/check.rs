//! Static check report formatting.

use super::to_pretty_json;
use crate::artifact::{Severity, StaticReport};
use crate::error::ApiError;
use owo_colors::OwoColorize;
use serde_json::json;
use std::path::Path;

pub fn format_check_report_text(path: &Path, report: &StaticReport) -> String {
    let mut out = format!("{}\n", path.display().bold().underline());
    match &report.entry_point {
        Ok(entry) => out.push_str(&format!("  entry point: {} ({:?})\n", entry.name, entry.via)),
        Err(e) => out.push_str(&format!("  entry point: {}\n", e.red())),
    }
    if report.findings.is_empty() {
        out.push_str(&format!("  {} no findings\n", "✓".green()));
    }
    for finding in &report.findings {
        let marker = match finding.severity {
            Severity::Error => "✗".red().to_string(),
            Severity::Warning => "!".yellow().to_string(),
            Severity::Info => "·".dimmed().to_string(),
        };
        out.push_str(&format!("  {} {}\n", marker, finding));
    }
    if report.passes() {
        out.push_str(&format!("{}", "Ready to render".green()));
    } else {
        out.push_str(&format!("{}", "Would be sent for correction".red()));
    }
    out
}

pub fn format_check_report_json(path: &Path, report: &StaticReport) -> Result<String, ApiError> {
    let entry_point = match &report.entry_point {
        Ok(entry) => json!(entry),
        Err(e) => json!({ "error": e.to_string() }),
    };
    to_pretty_json(&json!({
        "file": path.display().to_string(),
        "passes": report.passes(),
        "entry_point": entry_point,
        "findings": report.findings,
    }))
}
