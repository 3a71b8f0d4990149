//! Local generator for development without a generative service.
//!
//! Accepts every prompt, echoes it as the plan and answers generation and correction
//! with the bundled reference scene.

use super::prompts::REFERENCE_EXAMPLE;
use super::{
    AudienceLevel, Classification, CorrectionInput, GeneratedArtifact, Generator, ScenePlan,
    Verdict,
};
use crate::error::GenerationError;
use async_trait::async_trait;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct OfflineGenerator {
    artifact: Option<String>,
}

impl OfflineGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer generation and correction with `artifact` instead of the bundled scene.
    pub fn with_artifact(artifact: impl Into<String>) -> Self {
        Self {
            artifact: Some(artifact.into()),
        }
    }

    fn artifact(&self) -> GeneratedArtifact {
        GeneratedArtifact {
            code: self
                .artifact
                .clone()
                .unwrap_or_else(|| REFERENCE_EXAMPLE.to_string()),
            explanation: Some("Offline mode: bundled scene".to_string()),
            fixes: Vec::new(),
        }
    }
}

#[async_trait]
impl Generator for OfflineGenerator {
    async fn classify(&self, prompt: &str) -> Result<Classification, GenerationError> {
        Ok(Classification {
            verdict: Verdict::Valid,
            explanation: "Offline mode: input accepted without classification".to_string(),
            suggestion: None,
            reformulated_prompt: Some(prompt.to_string()),
        })
    }

    async fn plan(
        &self,
        prompt: &str,
        level: AudienceLevel,
    ) -> Result<ScenePlan, GenerationError> {
        Ok(ScenePlan {
            plan: format!("Offline plan ({} level): {}", level, prompt),
            reasoning: None,
        })
    }

    async fn generate(
        &self,
        _prompt: &str,
        _plan: &str,
        _level: AudienceLevel,
    ) -> Result<GeneratedArtifact, GenerationError> {
        info!("Offline mode: returning bundled scene");
        Ok(self.artifact())
    }

    async fn correct(
        &self,
        input: CorrectionInput<'_>,
    ) -> Result<GeneratedArtifact, GenerationError> {
        info!(attempt = input.attempt, "Offline mode: returning bundled scene as correction");
        Ok(self.artifact())
    }
}
