//! Scripted collaborators for pipeline tests.
//!
//! Both doubles count their calls behind `parking_lot::Mutex` so tests can assert
//! exactly how many generative calls and renders a run made.

use async_trait::async_trait;
use leap::config::PipelineConfig;
use leap::error::{GenerationError, SandboxError};
use leap::generation::prompts::REFERENCE_EXAMPLE;
use leap::generation::{
    AudienceLevel, Classification, CorrectionInput, GeneratedArtifact, Generator, ScenePlan,
    Verdict,
};
use leap::logging::JobLoggerFactory;
use leap::pipeline::Orchestrator;
use leap::sandbox::{ArtifactExecutor, ExecutionRequest, ExecutionResult};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Artifact that lacks both required imports and any scene class.
pub const BROKEN_ARTIFACT: &str = "def main():\n    print('hello')\n";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Calls {
    pub classify: usize,
    pub plan: usize,
    pub generate: usize,
    pub correct: usize,
}

impl Calls {
    pub fn total(&self) -> usize {
        self.classify + self.plan + self.generate + self.correct
    }
}

pub struct ScriptedGenerator {
    classification: Result<Classification, String>,
    plan_fault: Option<String>,
    generated: Mutex<VecDeque<Result<String, String>>>,
    corrections: Mutex<VecDeque<Result<String, String>>>,
    calls: Mutex<Calls>,
    correction_failures: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    /// Accepts every prompt and answers generation and correction with the
    /// reference scene until scripted otherwise.
    pub fn new() -> Self {
        Self {
            classification: Ok(Classification {
                verdict: Verdict::Valid,
                explanation: "clear question".to_string(),
                suggestion: None,
                reformulated_prompt: None,
            }),
            plan_fault: None,
            generated: Mutex::new(VecDeque::new()),
            corrections: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Calls::default()),
            correction_failures: Mutex::new(Vec::new()),
        }
    }

    pub fn classify_as(mut self, classification: Classification) -> Self {
        self.classification = Ok(classification);
        self
    }

    pub fn classifier_down(mut self, reason: &str) -> Self {
        self.classification = Err(reason.to_string());
        self
    }

    pub fn plan_fault(mut self, reason: &str) -> Self {
        self.plan_fault = Some(reason.to_string());
        self
    }

    pub fn generates(self, code: &str) -> Self {
        self.generated.lock().push_back(Ok(code.to_string()));
        self
    }

    pub fn generation_fault(self, reason: &str) -> Self {
        self.generated.lock().push_back(Err(reason.to_string()));
        self
    }

    pub fn corrects_to(self, code: &str) -> Self {
        self.corrections.lock().push_back(Ok(code.to_string()));
        self
    }

    pub fn correction_fault(self, reason: &str) -> Self {
        self.corrections.lock().push_back(Err(reason.to_string()));
        self
    }

    pub fn calls(&self) -> Calls {
        *self.calls.lock()
    }

    /// Failure texts handed to each correction call, in order.
    pub fn correction_failures(&self) -> Vec<String> {
        self.correction_failures.lock().clone()
    }

    fn answer(queue: &Mutex<VecDeque<Result<String, String>>>) -> Result<GeneratedArtifact, GenerationError> {
        let next = queue
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(REFERENCE_EXAMPLE.to_string()));
        match next {
            Ok(code) => Ok(GeneratedArtifact {
                code,
                explanation: Some("scripted".to_string()),
                fixes: vec!["scripted fix".to_string()],
            }),
            Err(reason) => Err(GenerationError::Unavailable(reason)),
        }
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn classify(&self, _prompt: &str) -> Result<Classification, GenerationError> {
        self.calls.lock().classify += 1;
        self.classification
            .clone()
            .map_err(GenerationError::Unavailable)
    }

    async fn plan(&self, prompt: &str, _level: AudienceLevel) -> Result<ScenePlan, GenerationError> {
        self.calls.lock().plan += 1;
        match &self.plan_fault {
            Some(reason) => Err(GenerationError::Unavailable(reason.clone())),
            None => Ok(ScenePlan {
                plan: format!("Scene 1: {}", prompt),
                reasoning: None,
            }),
        }
    }

    async fn generate(
        &self,
        _prompt: &str,
        _plan: &str,
        _level: AudienceLevel,
    ) -> Result<GeneratedArtifact, GenerationError> {
        self.calls.lock().generate += 1;
        Self::answer(&self.generated)
    }

    async fn correct(
        &self,
        input: CorrectionInput<'_>,
    ) -> Result<GeneratedArtifact, GenerationError> {
        self.calls.lock().correct += 1;
        self.correction_failures.lock().push(input.failure.to_string());
        Self::answer(&self.corrections)
    }
}

pub struct ScriptedExecutor {
    results: Mutex<VecDeque<ExecutionResult>>,
    rendered: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    /// Fails every render until scripted otherwise.
    pub fn new() -> Self {
        Self {
            results: Mutex::new(VecDeque::new()),
            rendered: Mutex::new(Vec::new()),
        }
    }

    pub fn succeeds(self, locator: &str) -> Self {
        self.results.lock().push_back(ExecutionResult {
            success: true,
            output_locator: Some(locator.to_string()),
            log_tail: String::new(),
            error: None,
            artifact_path: None,
        });
        self
    }

    pub fn fails(self, error: &str) -> Self {
        self.results
            .lock()
            .push_back(ExecutionResult::failed(error));
        self
    }

    pub fn calls(&self) -> usize {
        self.rendered.lock().len()
    }

    pub fn rendered(&self) -> Vec<String> {
        self.rendered.lock().clone()
    }
}

#[async_trait]
impl ArtifactExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        artifact: &str,
        _request: &ExecutionRequest,
    ) -> Result<ExecutionResult, SandboxError> {
        self.rendered.lock().push(artifact.to_string());
        Ok(self
            .results
            .lock()
            .pop_front()
            .unwrap_or_else(|| ExecutionResult::failed("Traceback: scripted render failure")))
    }
}

pub fn orchestrator(
    generator: Arc<ScriptedGenerator>,
    executor: Arc<ScriptedExecutor>,
    budget: u32,
) -> Orchestrator {
    orchestrator_with(generator, executor, budget, JobLoggerFactory::tracing_only())
}

pub fn orchestrator_with(
    generator: Arc<ScriptedGenerator>,
    executor: Arc<ScriptedExecutor>,
    budget: u32,
    loggers: JobLoggerFactory,
) -> Orchestrator {
    let config = PipelineConfig {
        attempt_budget: budget,
        ..PipelineConfig::default()
    };
    Orchestrator::new(generator, executor, &config, loggers)
}
