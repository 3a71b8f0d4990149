//! Error types for the Leap animation pipeline.
//!
//! Infrastructure errors (`StorageError`, `ProviderError`, `GenerationError`,
//! `SandboxError`, `DeliveryError`, `ApiError`) are ordinary `Result` errors. `PipelineError` is the
//! job-level failure taxonomy and is carried as data on the terminal pipeline state.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Job-record storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Illegal job status transition for {job_id}: {from} -> {to}")]
    InvalidTransition {
        job_id: String,
        from: String,
        to: String,
    },

    #[error("Corrupt job record: {0}")]
    Corrupt(String),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors raised by a model provider client
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider error: {0}")]
    Other(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Provider request failed: {0}")]
    RequestFailed(String),

    #[error("Provider authentication failed: {0}")]
    AuthFailed(String),

    #[error("Provider rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Provider model not found: {0}")]
    ModelNotFound(String),
}

/// Errors raised by one structured generative call
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Malformed {task} response: {detail}")]
    MalformedResponse { task: &'static str, detail: String },

    #[error("Generator unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised while orchestrating the renderer subprocess
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("Sandbox I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to start renderer `{program}`: {reason}")]
    Spawn { program: String, reason: String },

    #[error("Render slot unavailable: {0}")]
    Capacity(String),
}

/// Errors from post-success side effects. Logged, never fatal to a job.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Publishing output failed: {0}")]
    Publish(String),

    #[error("Sending notification failed: {0}")]
    Notify(String),
}

/// Surface error for configuration, logging, persistence and the job service
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error(transparent)]
    ProviderError(#[from] ProviderError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// `summary` is the rendered run report shown to the user.
    #[error("{message}")]
    JobFailed {
        job_id: String,
        message: String,
        summary: String,
    },

    #[error("{0}")]
    InvalidInput(String),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

/// Why a job ended in failure.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum PipelineError {
    #[error("{message}")]
    InputRejected {
        message: String,
        suggestion: Option<String>,
    },

    #[error("Scene planning failed: {0}")]
    PlanningFailed(String),

    #[error("Static validation failed:\n{0}")]
    StaticValidationFailed(String),

    #[error("Error executing code: {0}")]
    ExecutionFailed(String),

    #[error("Error correction failed: {0}")]
    CorrectionFailed(String),

    #[error("Gave up after {attempts} correction attempts: {last_error}")]
    BudgetExhausted { attempts: u32, last_error: String },
}

impl PipelineError {
    /// Retryable failures are routed to correction while budget remains.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PipelineError::StaticValidationFailed(_) | PipelineError::ExecutionFailed(_)
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::InputRejected { .. } => "input_rejected",
            PipelineError::PlanningFailed(_) => "planning_failed",
            PipelineError::StaticValidationFailed(_) => "static_validation_failed",
            PipelineError::ExecutionFailed(_) => "execution_failed",
            PipelineError::CorrectionFailed(_) => "correction_failed",
            PipelineError::BudgetExhausted { .. } => "budget_exhausted",
        }
    }
}
