//! Structured generative calls behind one narrow interface.
//!
//! Each task (classification, planning, code generation, correction) has one method
//! and a fixed result type. `ProviderGenerator` answers through a chat-completion
//! provider; `OfflineGenerator` answers locally from bundled templates.

pub mod offline;
pub mod prompts;
pub mod provider_backed;

use crate::error::{GenerationError, ProviderError};
use crate::provider::{ProviderConfig, ProviderFactory};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub use offline::OfflineGenerator;
pub use provider_backed::ProviderGenerator;

/// How technical the explanation should be.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum AudienceLevel {
    #[serde(alias = "eli5")]
    #[value(alias = "eli5")]
    Simplified,
    #[default]
    #[serde(alias = "normal")]
    #[value(alias = "normal")]
    Standard,
    Advanced,
}

impl AudienceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudienceLevel::Simplified => "simplified",
            AudienceLevel::Standard => "standard",
            AudienceLevel::Advanced => "advanced",
        }
    }
}

impl fmt::Display for AudienceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AudienceLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "simplified" | "eli5" => Ok(AudienceLevel::Simplified),
            "standard" | "normal" => Ok(AudienceLevel::Standard),
            "advanced" => Ok(AudienceLevel::Advanced),
            other => Err(format!("Unknown audience level: {}", other)),
        }
    }
}

/// Intent classification verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Valid,
    NeedsClarification,
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    #[serde(rename = "classification")]
    pub verdict: Verdict,
    pub explanation: String,
    #[serde(default)]
    pub suggestion: Option<String>,
    #[serde(default, rename = "reformulated_question")]
    pub reformulated_prompt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenePlan {
    pub plan: String,
    #[serde(default)]
    pub reasoning: Option<String>,
}

/// A complete replacement artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    pub code: String,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default, alias = "error_fixes")]
    pub fixes: Vec<String>,
}

/// Everything the correction call sees.
#[derive(Debug, Clone, Copy)]
pub struct CorrectionInput<'a> {
    pub prompt: &'a str,
    pub plan: &'a str,
    pub artifact: &'a str,
    pub failure: &'a str,
    pub level: AudienceLevel,
    /// 1-based number of this correction
    pub attempt: u32,
}

#[async_trait]
pub trait Generator: Send + Sync {
    async fn classify(&self, prompt: &str) -> Result<Classification, GenerationError>;

    async fn plan(&self, prompt: &str, level: AudienceLevel)
        -> Result<ScenePlan, GenerationError>;

    async fn generate(
        &self,
        prompt: &str,
        plan: &str,
        level: AudienceLevel,
    ) -> Result<GeneratedArtifact, GenerationError>;

    async fn correct(
        &self,
        input: CorrectionInput<'_>,
    ) -> Result<GeneratedArtifact, GenerationError>;
}

/// Generator selected by `[provider]`: local when offline, else provider-backed.
pub fn from_config(config: &ProviderConfig) -> Result<Arc<dyn Generator>, ProviderError> {
    if config.offline {
        return Ok(Arc::new(OfflineGenerator::new()));
    }
    let provider = config.to_model_provider()?;
    let client = ProviderFactory::create_client(&provider)?;
    Ok(Arc::new(ProviderGenerator::new(
        client,
        config.default_options(),
    )))
}
