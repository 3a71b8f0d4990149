//! Persisted job record.

use crate::generation::AudienceLevel;
use crate::pipeline::PipelineRequest;
use crate::sandbox::QualityTier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Status only moves forward. Rewriting the current status is allowed so updates
    /// stay idempotent.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        self == next
            || matches!(
                (self, next),
                (Pending, Processing) | (Pending, Failed) | (Processing, Completed) | (Processing, Failed)
            )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub prompt: String,
    pub level: AudienceLevel,
    pub quality: QualityTier,
    pub status: JobStatus,
    pub output_locator: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    pub fn pending(id: impl Into<String>, request: &PipelineRequest) -> Self {
        Self {
            id: id.into(),
            prompt: request.prompt.clone(),
            level: request.level,
            quality: request.quality,
            status: JobStatus::Pending,
            output_locator: None,
            error: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}
