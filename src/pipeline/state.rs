//! Per-job pipeline data: the immutable request and the state record threaded
//! through every stage.

use crate::artifact::ValidationFinding;
use crate::error::PipelineError;
use crate::generation::AudienceLevel;
use crate::naming::slugify;
use crate::sandbox::{ExecutionResult, QualityTier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_VOICE: &str = "nova";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRequest {
    pub prompt: String,
    pub level: AudienceLevel,
    pub quality: QualityTier,
    /// Narrator voice id
    pub voice: String,
    /// Where to send the completion notice
    pub contact: Option<String>,
}

impl PipelineRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            level: AudienceLevel::default(),
            quality: QualityTier::default(),
            voice: DEFAULT_VOICE.to_string(),
            contact: None,
        }
    }

    pub fn with_level(self, level: AudienceLevel) -> Self {
        Self { level, ..self }
    }

    pub fn with_quality(self, quality: QualityTier) -> Self {
        Self { quality, ..self }
    }

    pub fn with_voice(self, voice: impl Into<String>) -> Self {
        Self {
            voice: voice.into(),
            ..self
        }
    }

    pub fn with_contact(self, contact: Option<String>) -> Self {
        Self { contact, ..self }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure,
}

/// Pipeline stages; `Terminal` ends the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    InputGate,
    Plan,
    Generate,
    Validate,
    Execute,
    Correct,
    Terminal(Outcome),
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::InputGate => "input_gate",
            Stage::Plan => "plan",
            Stage::Generate => "generate",
            Stage::Validate => "validate",
            Stage::Execute => "execute",
            Stage::Correct => "correct",
            Stage::Terminal(Outcome::Success) => "success",
            Stage::Terminal(Outcome::Failure) => "failure",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Terminal(_))
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Input gate verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateStatus {
    Pending,
    Valid,
    NeedsClarification,
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: Stage,
    pub to: Stage,
    /// Attempt counter when the transition was taken
    pub attempts: u32,
    pub at: DateTime<Utc>,
}

/// Record threaded through every stage. Stages consume it and return a new one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    pub job_id: String,
    pub request: PipelineRequest,
    pub gate: GateStatus,
    pub reformulated_prompt: Option<String>,
    pub plan: Option<String>,
    /// Current artifact; replaced wholesale by generation and correction
    pub artifact: Option<String>,
    pub findings: Vec<ValidationFinding>,
    pub execution: Option<ExecutionResult>,
    /// Latest retryable failure
    pub error: Option<PipelineError>,
    /// Why the job ended, when it failed
    pub failure: Option<PipelineError>,
    /// Correction calls made so far
    pub attempts: u32,
    pub transitions: Vec<Transition>,
}

impl PipelineState {
    pub fn new(job_id: impl Into<String>, request: PipelineRequest) -> Self {
        Self {
            job_id: job_id.into(),
            request,
            gate: GateStatus::Pending,
            reformulated_prompt: None,
            plan: None,
            artifact: None,
            findings: Vec::new(),
            execution: None,
            error: None,
            failure: None,
            attempts: 0,
            transitions: Vec::new(),
        }
    }

    /// The reformulated prompt when the gate produced one, else the original.
    pub fn effective_prompt(&self) -> &str {
        self.reformulated_prompt
            .as_deref()
            .unwrap_or_else(|| self.request.prompt.trim())
    }

    pub fn slug(&self) -> String {
        slugify(&self.request.prompt)
    }

    pub fn execution_succeeded(&self) -> bool {
        self.execution.as_ref().is_some_and(|e| e.success)
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none() && self.execution_succeeded()
    }

    pub fn output_locator(&self) -> Option<&str> {
        self.execution
            .as_ref()
            .filter(|e| e.success)
            .and_then(|e| e.output_locator.as_deref())
    }

    /// Final error text: the terminal failure, else the latest retryable error.
    pub fn error_text(&self) -> Option<String> {
        self.failure
            .as_ref()
            .or(self.error.as_ref())
            .map(ToString::to_string)
    }

    /// Stage sequence taken, starting from the first stage.
    pub fn stage_path(&self) -> Vec<Stage> {
        let mut path: Vec<Stage> = self.transitions.first().map(|t| t.from).into_iter().collect();
        path.extend(self.transitions.iter().map(|t| t.to));
        path
    }

    pub fn with_transition(mut self, from: Stage, to: Stage) -> Self {
        self.transitions.push(Transition {
            from,
            to,
            attempts: self.attempts,
            at: Utc::now(),
        });
        self
    }
}
