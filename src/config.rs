//! Configuration System
//!
//! Layered settings for the animation pipeline. Sources, lowest precedence first:
//! built-in defaults, the user-level file, workspace files (`config/config.toml`,
//! `config/{LEAP_ENV}.toml`) and `LEAP__SECTION__KEY` environment variables.

use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use crate::provider::{ProviderConfig, ProviderType};
pub use crate::sandbox::{QualityProfile, QualityTable, SandboxConfig};

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::global_file::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeapConfig {
    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub sandbox: SandboxConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Orchestrator and input gate settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum number of correction cycles per job
    #[serde(default = "default_attempt_budget")]
    pub attempt_budget: u32,

    #[serde(default = "default_min_prompt_chars")]
    pub min_prompt_chars: usize,

    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,

    /// Treat a failed classification call as VALID input
    #[serde(default = "default_true")]
    pub fail_open_on_classifier_error: bool,
}

fn default_attempt_budget() -> u32 {
    5
}

fn default_min_prompt_chars() -> usize {
    10
}

fn default_max_prompt_chars() -> usize {
    140
}

fn default_true() -> bool {
    true
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            attempt_budget: default_attempt_budget(),
            min_prompt_chars: default_min_prompt_chars(),
            max_prompt_chars: default_max_prompt_chars(),
            fail_open_on_classifier_error: default_true(),
        }
    }
}

/// Storage paths
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// sled database holding job records
    #[serde(default = "default_job_store_path")]
    pub job_store_path: PathBuf,

    /// Per-job JSON-lines logs; unset disables them
    #[serde(default = "default_log_dir")]
    pub log_dir: Option<PathBuf>,
}

fn default_job_store_path() -> PathBuf {
    PathBuf::from(".leap/jobs")
}

fn default_log_dir() -> Option<PathBuf> {
    Some(PathBuf::from(".leap/logs"))
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            job_store_path: default_job_store_path(),
            log_dir: default_log_dir(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Provider(String),
    Pipeline(String),
    Sandbox(String),
    Storage(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Provider(msg) => write!(f, "Provider: {}", msg),
            ValidationError::Pipeline(msg) => write!(f, "Pipeline: {}", msg),
            ValidationError::Sandbox(msg) => write!(f, "Sandbox: {}", msg),
            ValidationError::Storage(msg) => write!(f, "Storage: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.attempt_budget < 1 {
            return Err("attempt_budget must be at least 1".to_string());
        }
        if self.min_prompt_chars == 0 {
            return Err("min_prompt_chars must be at least 1".to_string());
        }
        if self.min_prompt_chars > self.max_prompt_chars {
            return Err(format!(
                "min_prompt_chars ({}) exceeds max_prompt_chars ({})",
                self.min_prompt_chars, self.max_prompt_chars
            ));
        }
        Ok(())
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.job_store_path.as_os_str().is_empty() {
            return Err("Job store path cannot be empty".to_string());
        }
        Ok(())
    }
}

impl LeapConfig {
    /// Validate every section, collecting all problems.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if !self.provider.offline {
            if let Err(e) = self.provider.validate() {
                errors.push(ValidationError::Provider(e));
            }
        }
        if let Err(e) = self.pipeline.validate() {
            errors.push(ValidationError::Pipeline(e));
        }
        for e in self.sandbox.validate() {
            errors.push(ValidationError::Sandbox(e));
        }
        if let Err(e) = self.storage.validate() {
            errors.push(ValidationError::Storage(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Anchor relative paths at `workspace_root`.
    pub fn resolve_paths(&mut self, workspace_root: &Path) {
        let anchor = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = workspace_root.join(&*path);
            }
        };
        anchor(&mut self.sandbox.code_dir);
        anchor(&mut self.sandbox.media_dir);
        anchor(&mut self.storage.job_store_path);
        if let Some(dir) = self.storage.log_dir.as_mut() {
            anchor(dir);
        }
    }
}
