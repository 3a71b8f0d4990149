//! Pipeline driver: runs stages in the order the transition table dictates and
//! closes every run with exactly one end-of-run log entry.

use super::gate::InputGate;
use super::stages;
use super::state::{Outcome, PipelineRequest, PipelineState, Stage};
use super::transition;
use crate::artifact::RuleSet;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::generation::Generator;
use crate::logging::{JobLogger, JobLoggerFactory};
use crate::sandbox::ArtifactExecutor;
use std::sync::Arc;
use uuid::Uuid;

pub struct Orchestrator {
    generator: Arc<dyn Generator>,
    executor: Arc<dyn ArtifactExecutor>,
    gate: InputGate,
    rules: RuleSet,
    budget: u32,
    loggers: JobLoggerFactory,
}

impl Orchestrator {
    pub fn new(
        generator: Arc<dyn Generator>,
        executor: Arc<dyn ArtifactExecutor>,
        config: &PipelineConfig,
        loggers: JobLoggerFactory,
    ) -> Self {
        Self {
            generator,
            executor,
            gate: InputGate::from_config(config),
            rules: RuleSet::new(),
            budget: config.attempt_budget.max(1),
            loggers,
        }
    }

    pub fn budget(&self) -> u32 {
        self.budget
    }

    /// Run a request under a fresh job id.
    pub async fn invoke(&self, request: PipelineRequest) -> PipelineState {
        let job_id = Uuid::new_v4().to_string();
        self.invoke_job(&job_id, request).await
    }

    /// Run a request to its terminal state.
    pub async fn invoke_job(&self, job_id: &str, request: PipelineRequest) -> PipelineState {
        let logger = self.loggers.create(job_id, &request.prompt);
        let mut state = PipelineState::new(job_id, request);
        let mut stage = Stage::InputGate;

        loop {
            if let Stage::Terminal(outcome) = stage {
                let state = finalize(state, outcome);
                log_run_end(&state, &logger);
                return state;
            }
            state = self.run_stage(stage, state, &logger).await;
            let next = transition::next(stage, &state, self.budget);
            state = state.with_transition(stage, next);
            stage = next;
        }
    }

    async fn run_stage(
        &self,
        stage: Stage,
        state: PipelineState,
        logger: &JobLogger,
    ) -> PipelineState {
        match stage {
            Stage::InputGate => self.gate.check(state, self.generator.as_ref(), logger).await,
            Stage::Plan => stages::plan(state, self.generator.as_ref(), logger).await,
            Stage::Generate => stages::generate(state, self.generator.as_ref(), logger).await,
            Stage::Validate => stages::validate(state, &self.rules, logger),
            Stage::Execute => stages::execute(state, self.executor.as_ref(), logger).await,
            Stage::Correct => {
                stages::correct(state, self.generator.as_ref(), self.budget, logger).await
            }
            Stage::Terminal(_) => state,
        }
    }
}

/// A failed run without a recorded cause ran out of correction budget.
fn finalize(state: PipelineState, outcome: Outcome) -> PipelineState {
    match outcome {
        Outcome::Success => state,
        Outcome::Failure if state.failure.is_some() => state,
        Outcome::Failure => {
            let last_error = state
                .error
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "Unknown error".to_string());
            PipelineState {
                failure: Some(PipelineError::BudgetExhausted {
                    attempts: state.attempts,
                    last_error,
                }),
                ..state
            }
        }
    }
}

fn log_run_end(state: &PipelineState, logger: &JobLogger) {
    if state.is_success() {
        logger.finish(
            true,
            format!(
                "Job completed after {} correction(s): {}",
                state.attempts,
                state.output_locator().unwrap_or("-")
            ),
        );
    } else {
        logger.finish(
            false,
            format!(
                "Job failed: {}",
                state.error_text().unwrap_or_else(|| "Unknown error".to_string())
            ),
        );
    }
}
