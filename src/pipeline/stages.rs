//! Stage functions. Each consumes the state and returns its successor; collaborator
//! faults are folded into the returned state rather than propagated.

use super::state::PipelineState;
use crate::artifact::{format_findings, normalize, passes, RuleSet};
use crate::error::PipelineError;
use crate::generation::{CorrectionInput, Generator};
use crate::logging::JobLogger;
use crate::sandbox::{ArtifactExecutor, ExecutionRequest, ExecutionResult};

const LOGGED_FIXES: usize = 5;

pub async fn plan(
    state: PipelineState,
    generator: &dyn Generator,
    logger: &JobLogger,
) -> PipelineState {
    logger.info(
        "plan",
        format!("Planning scenes ({} level)", state.request.level),
    );
    let result = generator
        .plan(state.effective_prompt(), state.request.level)
        .await;
    match result {
        Ok(plan) => {
            logger.info("plan", format!("Plan ready ({} chars)", plan.plan.len()));
            PipelineState {
                plan: Some(plan.plan),
                ..state
            }
        }
        Err(e) => {
            logger.error("plan", format!("Scene planning failed: {}", e));
            PipelineState {
                failure: Some(PipelineError::PlanningFailed(e.to_string())),
                ..state
            }
        }
    }
}

pub async fn generate(
    state: PipelineState,
    generator: &dyn Generator,
    logger: &JobLogger,
) -> PipelineState {
    logger.info("generate", "Generating scene code");
    let plan = state.plan.clone().unwrap_or_default();
    let result = generator
        .generate(state.effective_prompt(), &plan, state.request.level)
        .await;
    match result {
        Ok(artifact) => {
            let code = normalize(&artifact.code);
            logger.info(
                "generate",
                format!("Generated {} lines of code", code.lines().count()),
            );
            PipelineState {
                artifact: Some(code),
                error: None,
                ..state
            }
        }
        Err(e) => {
            logger.error("generate", format!("Code generation failed: {}", e));
            PipelineState {
                artifact: None,
                error: Some(PipelineError::StaticValidationFailed(format!(
                    "Code generation failed: {}; no code to validate",
                    e
                ))),
                ..state
            }
        }
    }
}

pub fn validate(state: PipelineState, rules: &RuleSet, logger: &JobLogger) -> PipelineState {
    let Some(artifact) = state.artifact.as_deref() else {
        let error = state
            .error
            .clone()
            .unwrap_or_else(|| PipelineError::StaticValidationFailed("No code to validate".into()));
        logger.error("validate", error.to_string());
        return PipelineState {
            findings: Vec::new(),
            error: Some(error),
            ..state
        };
    };

    logger.info(
        "validate",
        format!("Validating code ({} lines)", artifact.lines().count()),
    );
    let findings = rules.validate(artifact);
    for (i, finding) in findings.iter().enumerate() {
        logger.info("validate", format!("  {}. {}", i + 1, finding));
    }

    if passes(&findings) {
        logger.info("validate", "Validation passed");
        PipelineState {
            findings,
            error: None,
            ..state
        }
    } else {
        let report = format_findings(&findings);
        logger.warn(
            "validate",
            format!("Validation found {} issue(s)", findings.len()),
        );
        PipelineState {
            findings,
            error: Some(PipelineError::StaticValidationFailed(report)),
            ..state
        }
    }
}

pub async fn execute(
    state: PipelineState,
    executor: &dyn ArtifactExecutor,
    logger: &JobLogger,
) -> PipelineState {
    let artifact = state.artifact.clone().unwrap_or_default();
    let request = ExecutionRequest {
        quality: state.request.quality,
        slug: state.slug(),
        voice: state.request.voice.clone(),
    };
    logger.info(
        "execute",
        format!(
            "Rendering at {} quality with voice {}",
            request.quality, request.voice
        ),
    );

    let result = match executor.execute(&artifact, &request).await {
        Ok(result) => result,
        Err(e) => ExecutionResult::failed(e.to_string()),
    };

    if result.success {
        logger.info(
            "execute",
            format!(
                "Render succeeded: {}",
                result.output_locator.as_deref().unwrap_or("-")
            ),
        );
        PipelineState {
            execution: Some(result),
            error: None,
            ..state
        }
    } else {
        let reason = result
            .error
            .clone()
            .unwrap_or_else(|| "Unknown error".to_string());
        let error = PipelineError::ExecutionFailed(reason);
        logger.error("execute", error.to_string());
        PipelineState {
            execution: Some(result),
            error: Some(error),
            ..state
        }
    }
}

pub async fn correct(
    state: PipelineState,
    generator: &dyn Generator,
    budget: u32,
    logger: &JobLogger,
) -> PipelineState {
    let last_error = state
        .error
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "Unknown error".to_string());

    if state.attempts >= budget {
        logger.warn(
            "correct",
            format!("Correction budget of {} exhausted", budget),
        );
        return PipelineState {
            failure: Some(PipelineError::BudgetExhausted {
                attempts: state.attempts,
                last_error,
            }),
            ..state
        };
    }

    let attempt = state.attempts + 1;
    logger.info(
        "correct",
        format!("Correction attempt {} of {}", attempt, budget),
    );
    let plan = state.plan.clone().unwrap_or_default();
    let artifact = state.artifact.clone().unwrap_or_default();
    let input = CorrectionInput {
        prompt: state.effective_prompt(),
        plan: &plan,
        artifact: &artifact,
        failure: &last_error,
        level: state.request.level,
        attempt,
    };

    let result = generator.correct(input).await;
    match result {
        Ok(corrected) => {
            if let Some(explanation) = &corrected.explanation {
                logger.info("correct", format!("Explanation: {}", explanation));
            }
            for fix in corrected.fixes.iter().take(LOGGED_FIXES) {
                logger.info("correct", format!("Fixed: {}", fix));
            }
            PipelineState {
                artifact: Some(normalize(&corrected.code)),
                attempts: attempt,
                ..state
            }
        }
        Err(e) => {
            logger.error("correct", format!("Error correction failed: {}", e));
            PipelineState {
                attempts: attempt,
                failure: Some(PipelineError::CorrectionFailed(e.to_string())),
                ..state
            }
        }
    }
}
