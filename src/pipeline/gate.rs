//! Input gate: cheap structural checks, then one intent classification call.

use super::state::{GateStatus, PipelineState};
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::generation::{Generator, Verdict};
use crate::logging::JobLogger;

const STAGE: &str = "input_gate";

#[derive(Debug, Clone)]
pub struct InputGate {
    min_chars: usize,
    max_chars: usize,
    fail_open: bool,
}

impl InputGate {
    pub fn new(min_chars: usize, max_chars: usize, fail_open: bool) -> Self {
        Self {
            min_chars,
            max_chars,
            fail_open,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.min_prompt_chars,
            config.max_prompt_chars,
            config.fail_open_on_classifier_error,
        )
    }

    /// Emptiness and length checks. No generative call is made.
    pub fn precheck(&self, prompt: &str) -> Result<(), PipelineError> {
        let prompt = prompt.trim();
        let chars = prompt.chars().count();
        let message = if prompt.is_empty() {
            "Input cannot be empty. Please provide a specific question or topic for animation."
                .to_string()
        } else if chars < self.min_chars {
            format!(
                "Input is too short, should be at least {} characters. Please provide a more detailed question or topic for animation.",
                self.min_chars
            )
        } else if chars > self.max_chars {
            format!(
                "Input is too long, keep it to {} characters or fewer. Please provide a more concise question or topic for animation.",
                self.max_chars
            )
        } else {
            return Ok(());
        };
        Err(PipelineError::InputRejected {
            message,
            suggestion: None,
        })
    }

    pub async fn check(
        &self,
        state: PipelineState,
        generator: &dyn Generator,
        logger: &JobLogger,
    ) -> PipelineState {
        logger.info(STAGE, format!("Validating input: '{}'", state.request.prompt));

        if let Err(rejection) = self.precheck(&state.request.prompt) {
            logger.error(STAGE, rejection.to_string());
            return PipelineState {
                gate: GateStatus::Invalid,
                failure: Some(rejection),
                ..state
            };
        }

        let prompt = state.request.prompt.trim().to_string();
        let classification = match generator.classify(&prompt).await {
            Ok(classification) => classification,
            Err(e) if self.fail_open => {
                logger.warn(
                    STAGE,
                    format!("Classifier unavailable, accepting input: {}", e),
                );
                return PipelineState {
                    gate: GateStatus::Valid,
                    ..state
                };
            }
            Err(e) => {
                logger.error(STAGE, format!("Classifier unavailable: {}", e));
                return PipelineState {
                    gate: GateStatus::Invalid,
                    failure: Some(PipelineError::InputRejected {
                        message: format!(
                            "We could not check your request right now, please try again later: {}",
                            e
                        ),
                        suggestion: None,
                    }),
                    ..state
                };
            }
        };

        let reformulated = classification
            .reformulated_prompt
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        let suggestion = classification
            .suggestion
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        logger.info(STAGE, format!("Input classified as {:?}", classification.verdict));

        match classification.verdict {
            Verdict::Valid => {
                if let Some(r) = &reformulated {
                    logger.info(STAGE, format!("Reformulated question: {}", r));
                }
                PipelineState {
                    gate: GateStatus::Valid,
                    reformulated_prompt: reformulated,
                    ..state
                }
            }
            Verdict::NeedsClarification => {
                let rephrased = reformulated.clone().unwrap_or_else(|| prompt.clone());
                let did_you_mean = format!("Did you mean: \"{}\"?", rephrased);
                let message = match &suggestion {
                    Some(s) => format!("Your question could be clearer. {} {}", did_you_mean, s),
                    None => format!("Your question could be clearer. {}", did_you_mean),
                };
                logger.warn(STAGE, &message);
                PipelineState {
                    gate: GateStatus::NeedsClarification,
                    reformulated_prompt: reformulated,
                    failure: Some(PipelineError::InputRejected {
                        message,
                        suggestion: Some(suggestion.unwrap_or(did_you_mean)),
                    }),
                    ..state
                }
            }
            Verdict::Invalid => {
                let message = format!(
                    "We're having trouble understanding your request: {}",
                    classification.explanation
                );
                logger.warn(STAGE, &message);
                PipelineState {
                    gate: GateStatus::Invalid,
                    reformulated_prompt: reformulated,
                    failure: Some(PipelineError::InputRejected {
                        message,
                        suggestion,
                    }),
                    ..state
                }
            }
        }
    }
}
