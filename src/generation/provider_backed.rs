//! Generator backed by a chat-completion provider.

use super::prompts::{self, PromptPair};
use super::{
    AudienceLevel, Classification, CorrectionInput, GeneratedArtifact, Generator, ScenePlan,
};
use crate::error::GenerationError;
use crate::provider::{CompletionOptions, ModelProviderClient};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

pub struct ProviderGenerator {
    client: Arc<dyn ModelProviderClient>,
    options: CompletionOptions,
}

impl ProviderGenerator {
    pub fn new(client: Arc<dyn ModelProviderClient>, options: CompletionOptions) -> Self {
        Self {
            client,
            options: CompletionOptions {
                json_response: true,
                ..options
            },
        }
    }

    async fn ask<T: DeserializeOwned>(
        &self,
        task: &'static str,
        prompt: PromptPair,
    ) -> Result<T, GenerationError> {
        debug!(
            task,
            provider = self.client.provider_name(),
            model = self.client.model_name(),
            "Requesting structured completion"
        );
        let response = self
            .client
            .complete(prompt.into_messages(), self.options.clone())
            .await?;
        parse_structured(task, &response.content)
    }
}

/// Strip a surrounding Markdown code fence, if any.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse a JSON answer, tolerating a code fence or prose around the object.
pub fn parse_structured<T: DeserializeOwned>(
    task: &'static str,
    content: &str,
) -> Result<T, GenerationError> {
    let body = strip_code_fence(content);
    match serde_json::from_str(body) {
        Ok(value) => Ok(value),
        Err(first) => {
            let object = match (body.find('{'), body.rfind('}')) {
                (Some(start), Some(end)) if start < end => &body[start..=end],
                _ => {
                    return Err(GenerationError::MalformedResponse {
                        task,
                        detail: first.to_string(),
                    })
                }
            };
            serde_json::from_str(object).map_err(|e| GenerationError::MalformedResponse {
                task,
                detail: e.to_string(),
            })
        }
    }
}

fn require_code(
    task: &'static str,
    mut artifact: GeneratedArtifact,
) -> Result<GeneratedArtifact, GenerationError> {
    // Some models fence the code inside the JSON string as well.
    artifact.code = strip_code_fence(&artifact.code).to_string();
    if artifact.code.trim().is_empty() {
        return Err(GenerationError::MalformedResponse {
            task,
            detail: "empty code".to_string(),
        });
    }
    Ok(artifact)
}

#[async_trait]
impl Generator for ProviderGenerator {
    async fn classify(&self, prompt: &str) -> Result<Classification, GenerationError> {
        self.ask("classification", prompts::classification(prompt))
            .await
    }

    async fn plan(
        &self,
        prompt: &str,
        level: AudienceLevel,
    ) -> Result<ScenePlan, GenerationError> {
        let plan: ScenePlan = self.ask("plan", prompts::planning(prompt, level)).await?;
        if plan.plan.trim().is_empty() {
            return Err(GenerationError::MalformedResponse {
                task: "plan",
                detail: "empty plan".to_string(),
            });
        }
        Ok(plan)
    }

    async fn generate(
        &self,
        prompt: &str,
        plan: &str,
        level: AudienceLevel,
    ) -> Result<GeneratedArtifact, GenerationError> {
        let artifact = self
            .ask("generation", prompts::generation(prompt, plan, level))
            .await?;
        require_code("generation", artifact)
    }

    async fn correct(
        &self,
        input: CorrectionInput<'_>,
    ) -> Result<GeneratedArtifact, GenerationError> {
        let artifact = self
            .ask("correction", prompts::correction(&input))
            .await?;
        require_code("correction", artifact)
    }
}
