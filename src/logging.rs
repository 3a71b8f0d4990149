//! Logging System
//!
//! Process-wide structured logging via `tracing`, plus per-job loggers. A
//! `JobLoggerFactory` is built once and handed to the orchestrator; each job gets
//! its own `JobLogger` (a tracing span and an optional JSON-lines file) that is torn
//! down when the run ends.

use crate::error::ApiError;
use crate::naming::slugify;
use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, info_span, warn, Span};
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Longest message emitted to the process log; job files keep full text.
pub const SURFACED_MESSAGE_CHARS: usize = 200;

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json, text (default: text)
    #[serde(default = "default_format")]
    pub format: String,

    /// Output destination: stdout, stderr, file
    #[serde(default = "default_output")]
    pub output: String,

    /// Log file path (if output is "file")
    #[serde(default = "default_log_file")]
    pub file: PathBuf,

    /// Enable colored output (text format only, stdout/stderr only)
    #[serde(default = "default_true")]
    pub color: bool,

    /// Module-specific log levels
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_output() -> String {
    "stderr".to_string()
}

fn default_log_file() -> PathBuf {
    directories::ProjectDirs::from("", "", "leap")
        .map(|dirs| dirs.data_local_dir().join("leap.log"))
        .unwrap_or_else(|| PathBuf::from(".leap/leap.log"))
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_format(),
            output: default_output(),
            file: default_log_file(),
            color: default_true(),
            modules: HashMap::new(),
        }
    }
}

/// Initialize the logging system
///
/// Priority order (highest to lowest):
/// 1. Environment variables (LEAP_LOG, LEAP_LOG_FORMAT, LEAP_LOG_OUTPUT)
/// 2. Configuration (file or CLI overrides folded into it)
/// 3. Defaults
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), ApiError> {
    let filter = build_env_filter(config)?;
    let format = determine_format(config)?;
    let output = determine_output(config)?;
    let use_color = config.map(|c| c.color).unwrap_or(true);

    let base_subscriber = Registry::default().with(filter);

    let get_file_writer = || -> Result<File, ApiError> {
        let log_file = config
            .map(|c| c.file.clone())
            .unwrap_or_else(default_log_file);
        if let Some(parent) = log_file.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ApiError::ConfigError(format!("Failed to create log directory: {}", e))
            })?;
        }
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .map_err(|e| {
                ApiError::ConfigError(format!("Failed to open log file {:?}: {}", log_file, e))
            })
    };

    match (format.as_str(), output) {
        ("json", Output::File) => base_subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(std::sync::Mutex::new(get_file_writer()?)),
            )
            .try_init(),
        ("json", Output::Stdout) => base_subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(std::io::stdout),
            )
            .try_init(),
        ("json", Output::Stderr) => base_subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        (_, Output::File) => base_subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(get_file_writer()?)),
            )
            .try_init(),
        (_, Output::Stdout) => base_subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(use_color)
                    .with_writer(std::io::stdout),
            )
            .try_init(),
        (_, Output::Stderr) => base_subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(use_color)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    }
    .map_err(|e| ApiError::ConfigError(format!("Failed to install log subscriber: {}", e)))
}

/// Build environment filter from config or environment variables
fn build_env_filter(config: Option<&LoggingConfig>) -> Result<EnvFilter, ApiError> {
    if let Ok(filter) = EnvFilter::try_from_env("LEAP_LOG") {
        return Ok(filter);
    }

    let level = config.map(|c| c.level.as_str()).unwrap_or("info");
    if level == "off" {
        return Ok(EnvFilter::new("off"));
    }

    let mut filter = EnvFilter::new(level);
    if let Some(config) = config {
        for (module, module_level) in &config.modules {
            let directive = format!("{}={}", module, module_level);
            filter = filter.add_directive(
                directive
                    .parse()
                    .map_err(|e| ApiError::ConfigError(format!("Invalid log directive: {}", e)))?,
            );
        }
    }

    Ok(filter)
}

/// Determine output format from config or environment
fn determine_format(config: Option<&LoggingConfig>) -> Result<String, ApiError> {
    if let Ok(format) = std::env::var("LEAP_LOG_FORMAT") {
        if format == "json" || format == "text" {
            return Ok(format);
        }
    }

    let format = config.map(|c| c.format.as_str()).unwrap_or("text");
    if format != "json" && format != "text" {
        return Err(ApiError::ConfigError(format!(
            "Invalid log format: {} (must be 'json' or 'text')",
            format
        )));
    }

    Ok(format.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Output {
    Stdout,
    Stderr,
    File,
}

fn determine_output(config: Option<&LoggingConfig>) -> Result<Output, ApiError> {
    if let Ok(output) = std::env::var("LEAP_LOG_OUTPUT") {
        return parse_output(&output);
    }
    parse_output(config.map(|c| c.output.as_str()).unwrap_or("stderr"))
}

fn parse_output(output: &str) -> Result<Output, ApiError> {
    match output {
        "stdout" => Ok(Output::Stdout),
        "stderr" => Ok(Output::Stderr),
        "file" => Ok(Output::File),
        _ => Err(ApiError::ConfigError(format!(
            "Invalid log output: {} (must be 'stdout', 'stderr' or 'file')",
            output
        ))),
    }
}

/// Cut `message` to at most `max_chars` characters, marking the cut with `...`.
pub fn truncate_for_display(message: &str, max_chars: usize) -> String {
    if message.chars().count() <= max_chars {
        return message.to_string();
    }
    let kept: String = message.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// Creates one `JobLogger` per pipeline run.
#[derive(Debug, Clone, Default)]
pub struct JobLoggerFactory {
    log_dir: Option<PathBuf>,
}

impl JobLoggerFactory {
    /// Job loggers that also append JSON lines under `log_dir`.
    pub fn new(log_dir: Option<PathBuf>) -> Self {
        Self { log_dir }
    }

    /// Job loggers that only emit tracing events.
    pub fn tracing_only() -> Self {
        Self { log_dir: None }
    }

    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }

    pub fn create(&self, job_id: &str, prompt: &str) -> JobLogger {
        let span = info_span!("job", job_id = %job_id, prompt = %slugify(prompt));
        let (sink, log_path) = match &self.log_dir {
            Some(dir) => match open_job_file(dir, job_id, prompt) {
                Ok((file, path)) => (Some(Mutex::new(BufWriter::new(file))), Some(path)),
                Err(e) => {
                    warn!(job_id = %job_id, error = %e, "Job log file unavailable, using process log only");
                    (None, None)
                }
            },
            None => (None, None),
        };
        JobLogger {
            job_id: job_id.to_string(),
            span,
            sink,
            log_path,
            finished: AtomicBool::new(false),
        }
    }
}

fn open_job_file(dir: &Path, job_id: &str, prompt: &str) -> std::io::Result<(File, PathBuf)> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}_{}.jsonl", slugify(prompt), job_id));
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)?;
    Ok((file, path))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Severity {
    Info,
    Warn,
    Error,
}

impl Severity {
    fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }
}

/// Logger scoped to a single job.
pub struct JobLogger {
    job_id: String,
    span: Span,
    sink: Option<Mutex<BufWriter<File>>>,
    log_path: Option<PathBuf>,
    finished: AtomicBool,
}

impl JobLogger {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Path of this job's JSON-lines file, if one is being written.
    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    pub fn info(&self, stage: &str, message: impl AsRef<str>) {
        self.record(Severity::Info, stage, message.as_ref());
    }

    pub fn warn(&self, stage: &str, message: impl AsRef<str>) {
        self.record(Severity::Warn, stage, message.as_ref());
    }

    pub fn error(&self, stage: &str, message: impl AsRef<str>) {
        self.record(Severity::Error, stage, message.as_ref());
    }

    /// Emit the end-of-run entry. Only the first call per job is recorded;
    /// returns whether this call emitted it.
    pub fn finish(&self, success: bool, message: impl AsRef<str>) -> bool {
        if self.finished.swap(true, Ordering::SeqCst) {
            return false;
        }
        let severity = if success {
            Severity::Info
        } else {
            Severity::Error
        };
        self.record(severity, "end", message.as_ref());
        true
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    fn record(&self, severity: Severity, stage: &str, message: &str) {
        let surfaced = truncate_for_display(message, SURFACED_MESSAGE_CHARS);
        {
            let _entered = self.span.enter();
            match severity {
                Severity::Info => info!(stage = %stage, "{}", surfaced),
                Severity::Warn => warn!(stage = %stage, "{}", surfaced),
                Severity::Error => error!(stage = %stage, "{}", surfaced),
            }
        }

        if let Some(sink) = &self.sink {
            let line = json!({
                "ts": Utc::now().to_rfc3339(),
                "level": severity.as_str(),
                "job_id": self.job_id,
                "stage": stage,
                "message": message,
            });
            let mut writer = sink.lock();
            if let Err(e) = writeln!(writer, "{}", line) {
                warn!(job_id = %self.job_id, error = %e, "Failed to write job log line");
            }
        }
    }
}

impl Drop for JobLogger {
    fn drop(&mut self) {
        if let Some(sink) = &self.sink {
            let _ = sink.lock().flush();
        }
    }
}
