//! Execution sandbox: persists an artifact, runs the external renderer on it and
//! recovers either the produced output file or a bounded failure reason.
//!
//! Renderer processes are capped by a semaphore (`max_concurrent_renders`) and are
//! killed when they outlive `timeout_secs`.

use crate::artifact::resolve_entry_point;
use crate::error::SandboxError;
use crate::naming::short_digest;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Output quality tier requested by the user.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    #[default]
    Low,
    Medium,
    High,
}

impl QualityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityTier::Low => "low",
            QualityTier::Medium => "medium",
            QualityTier::High => "high",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(QualityTier::Low),
            "medium" => Ok(QualityTier::Medium),
            "high" => Ok(QualityTier::High),
            other => Err(format!("Unknown quality tier: {}", other)),
        }
    }
}

/// Renderer flag and the output directory name it produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityProfile {
    pub flag: String,
    pub directory: String,
}

impl QualityProfile {
    fn new(flag: &str, directory: &str) -> Self {
        Self {
            flag: flag.to_string(),
            directory: directory.to_string(),
        }
    }
}

fn default_low() -> QualityProfile {
    QualityProfile::new("-ql", "480p15")
}

fn default_medium() -> QualityProfile {
    QualityProfile::new("-qm", "720p30")
}

fn default_high() -> QualityProfile {
    QualityProfile::new("-qh", "1080p60")
}

/// Quality tier to renderer flag mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityTable {
    #[serde(default = "default_low")]
    pub low: QualityProfile,
    #[serde(default = "default_medium")]
    pub medium: QualityProfile,
    #[serde(default = "default_high")]
    pub high: QualityProfile,
}

impl Default for QualityTable {
    fn default() -> Self {
        Self {
            low: default_low(),
            medium: default_medium(),
            high: default_high(),
        }
    }
}

impl QualityTable {
    /// Profile for `tier`; a blank flag falls back to the low tier.
    pub fn profile(&self, tier: QualityTier) -> &QualityProfile {
        let profile = match tier {
            QualityTier::Low => &self.low,
            QualityTier::Medium => &self.medium,
            QualityTier::High => &self.high,
        };
        if profile.flag.trim().is_empty() {
            &self.low
        } else {
            profile
        }
    }
}

/// `[sandbox]` configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments placed before the quality flag
    #[serde(default = "default_args")]
    pub args: Vec<String>,

    #[serde(default = "default_code_dir")]
    pub code_dir: PathBuf,

    #[serde(default = "default_media_dir")]
    pub media_dir: PathBuf,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_concurrent_renders")]
    pub max_concurrent_renders: usize,

    #[serde(default = "default_output_extension")]
    pub output_extension: String,

    /// Lines of renderer stderr fed back as the failure reason
    #[serde(default = "default_stderr_tail_lines")]
    pub stderr_tail_lines: usize,

    #[serde(default)]
    pub quality: QualityTable,
}

fn default_program() -> String {
    "python".to_string()
}

fn default_args() -> Vec<String> {
    vec!["-m".to_string(), "manim".to_string()]
}

fn default_code_dir() -> PathBuf {
    PathBuf::from(".leap/generated/code")
}

fn default_media_dir() -> PathBuf {
    PathBuf::from(".leap/generated/media")
}

fn default_timeout_secs() -> u64 {
    180
}

fn default_max_concurrent_renders() -> usize {
    2
}

fn default_output_extension() -> String {
    "mp4".to_string()
}

fn default_stderr_tail_lines() -> usize {
    5
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            code_dir: default_code_dir(),
            media_dir: default_media_dir(),
            timeout_secs: default_timeout_secs(),
            max_concurrent_renders: default_max_concurrent_renders(),
            output_extension: default_output_extension(),
            stderr_tail_lines: default_stderr_tail_lines(),
            quality: QualityTable::default(),
        }
    }
}

impl SandboxConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.program.trim().is_empty() {
            errors.push("program cannot be empty".to_string());
        }
        if self.timeout_secs == 0 {
            errors.push("timeout_secs must be at least 1".to_string());
        }
        if self.max_concurrent_renders == 0 {
            errors.push("max_concurrent_renders must be at least 1".to_string());
        }
        if self.stderr_tail_lines == 0 {
            errors.push("stderr_tail_lines must be at least 1".to_string());
        }
        if self.quality.low.flag.trim().is_empty() {
            errors.push("quality.low.flag cannot be empty".to_string());
        }
        errors
    }
}

/// Per-run parameters for the renderer.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub quality: QualityTier,
    /// Filesystem-safe name derived from the prompt
    pub slug: String,
    pub voice: String,
}

/// Outcome of one renderer run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub output_locator: Option<String>,
    /// Tail of the renderer's output stream
    pub log_tail: String,
    pub error: Option<String>,
    /// Where the artifact was persisted for this run
    pub artifact_path: Option<PathBuf>,
}

impl ExecutionResult {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output_locator: None,
            log_tail: String::new(),
            error: Some(error.into()),
            artifact_path: None,
        }
    }
}

/// Runs a validated artifact.
#[async_trait]
pub trait ArtifactExecutor: Send + Sync {
    async fn execute(
        &self,
        artifact: &str,
        request: &ExecutionRequest,
    ) -> Result<ExecutionResult, SandboxError>;
}

/// Runs the configured renderer as a child process.
pub struct RenderSandbox {
    config: SandboxConfig,
    permits: Arc<Semaphore>,
}

impl RenderSandbox {
    pub fn new(config: SandboxConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_renders.max(1)));
        Self { config, permits }
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Write `artifact` under `code_dir` with a unique, prompt-derived name.
    pub async fn persist_artifact(
        &self,
        artifact: &str,
        slug: &str,
    ) -> Result<PathBuf, SandboxError> {
        tokio::fs::create_dir_all(&self.config.code_dir).await?;
        let file_name = format!(
            "{}_{}_{}.py",
            slug,
            Utc::now().format("%Y%m%d_%H%M%S%3f"),
            short_digest(artifact.as_bytes())
        );
        let path = self.config.code_dir.join(file_name);
        tokio::fs::write(&path, artifact).await?;
        Ok(path)
    }

    async fn run_renderer(
        &self,
        artifact_path: &Path,
        entry: &str,
        request: &ExecutionRequest,
    ) -> Result<ExecutionResult, SandboxError> {
        let profile = self.config.quality.profile(request.quality);
        tokio::fs::create_dir_all(&self.config.media_dir).await?;

        let _permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| SandboxError::Capacity(e.to_string()))?;

        let mut command = Command::new(&self.config.program);
        command
            .args(&self.config.args)
            .arg(&profile.flag)
            .arg("--media_dir")
            .arg(&self.config.media_dir)
            .arg(artifact_path)
            .arg(entry)
            .env("LEAP_VOICE", &request.voice)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        info!(
            program = %self.config.program,
            quality = %request.quality,
            entry = %entry,
            "Starting renderer"
        );

        let mut child = command.spawn().map_err(|e| SandboxError::Spawn {
            program: self.config.program.clone(),
            reason: e.to_string(),
        })?;

        let stdout_task = drain(child.stdout.take());
        let stderr_task = drain(child.stderr.take());

        let timeout = Duration::from_secs(self.config.timeout_secs);
        let status = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                warn!(timeout_secs = self.config.timeout_secs, "Renderer timed out, killing it");
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "Failed to kill renderer");
                }
                stdout_task.abort();
                stderr_task.abort();
                return Ok(ExecutionResult {
                    artifact_path: Some(artifact_path.to_path_buf()),
                    ..ExecutionResult::failed(format!(
                        "Renderer timed out after {} seconds",
                        self.config.timeout_secs
                    ))
                });
            }
        };

        let stdout = collect(stdout_task).await;
        let stderr = collect(stderr_task).await;
        let log_tail = tail_lines(&stdout, self.config.stderr_tail_lines);

        if !status.success() {
            let log_path = stderr_log_path(artifact_path);
            if let Err(e) = tokio::fs::write(&log_path, &stderr).await {
                warn!(error = %e, "Failed to save renderer stderr");
            }
            let tail = tail_lines(&stderr, self.config.stderr_tail_lines);
            let reason = if tail.is_empty() {
                format!("Renderer exited with {}", status)
            } else {
                tail
            };
            return Ok(ExecutionResult {
                success: false,
                output_locator: None,
                log_tail,
                error: Some(reason),
                artifact_path: Some(artifact_path.to_path_buf()),
            });
        }

        let found = locate_output(
            &self.config.media_dir,
            artifact_path,
            entry,
            &self.config.output_extension,
            &profile.directory,
        );
        Ok(match found {
            Some(path) => {
                info!(output = %path.display(), "Renderer produced output");
                ExecutionResult {
                    success: true,
                    output_locator: Some(path.display().to_string()),
                    log_tail,
                    error: None,
                    artifact_path: Some(artifact_path.to_path_buf()),
                }
            }
            None => ExecutionResult {
                log_tail,
                artifact_path: Some(artifact_path.to_path_buf()),
                ..ExecutionResult::failed(format!(
                    "Renderer exited successfully but no output file {}.{} was found",
                    entry, self.config.output_extension
                ))
            },
        })
    }
}

#[async_trait]
impl ArtifactExecutor for RenderSandbox {
    async fn execute(
        &self,
        artifact: &str,
        request: &ExecutionRequest,
    ) -> Result<ExecutionResult, SandboxError> {
        let artifact_path = self.persist_artifact(artifact, &request.slug).await?;
        debug!(path = %artifact_path.display(), "Artifact persisted");

        let entry = match resolve_entry_point(artifact) {
            Ok(entry) => entry,
            Err(e) => {
                return Ok(ExecutionResult {
                    artifact_path: Some(artifact_path),
                    ..ExecutionResult::failed(format!("Could not extract class name: {}", e))
                })
            }
        };
        debug!(entry = %entry.name, via = ?entry.via, "Entry point resolved");

        self.run_renderer(&artifact_path, &entry.name, request).await
    }
}

fn drain<R>(pipe: Option<R>) -> JoinHandle<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf).await;
        }
        buf
    })
}

async fn collect(task: JoinHandle<Vec<u8>>) -> String {
    match task.await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            warn!(error = %e, "Renderer output reader failed");
            String::new()
        }
    }
}

/// Last `n` non-empty lines of `text`.
pub fn tail_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

/// `<dir>/<stem>.stderr.log` next to the persisted artifact.
pub fn stderr_log_path(artifact_path: &Path) -> PathBuf {
    artifact_path.with_extension("stderr.log")
}

/// Find `<entry>.<ext>` produced for `artifact_path`.
///
/// The renderer writes under `<media_dir>/videos/<artifact stem>/`, and artifact names
/// are unique per run, so only that directory is searched. Files inside `quality_dir`
/// win, then the newest file.
pub fn locate_output(
    media_dir: &Path,
    artifact_path: &Path,
    entry: &str,
    extension: &str,
    quality_dir: &str,
) -> Option<PathBuf> {
    let stem = artifact_path.file_stem()?;
    let root = media_dir.join("videos").join(stem);
    let wanted = format!("{}.{}", entry, extension);
    WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && e.file_name().to_string_lossy() == wanted)
        .map(|e| {
            let in_quality_dir = e
                .path()
                .parent()
                .and_then(Path::file_name)
                .map(|name| name.to_string_lossy() == quality_dir)
                .unwrap_or(false);
            let modified = e
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (in_quality_dir, modified, e.into_path())
        })
        .max_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)))
        .map(|(_, _, path)| path)
}
