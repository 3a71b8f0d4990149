//! End-to-end pipeline scenarios against scripted collaborators.

use super::support::{
    orchestrator, orchestrator_with, ScriptedExecutor, ScriptedGenerator, BROKEN_ARTIFACT,
};
use leap::config::PipelineConfig;
use leap::error::PipelineError;
use leap::generation::prompts::REFERENCE_EXAMPLE;
use leap::generation::{Classification, Verdict};
use leap::logging::JobLoggerFactory;
use leap::pipeline::{GateStatus, Orchestrator, Outcome, PipelineRequest, Stage};
use std::sync::Arc;
use tempfile::TempDir;

const PROMPT: &str = "Why is the sum of angles in a triangle 180 degrees?";

fn count_edges(path: &[Stage], from: Stage, to: Stage) -> usize {
    path.windows(2).filter(|w| w[0] == from && w[1] == to).count()
}

#[tokio::test]
async fn empty_prompt_is_rejected_without_generative_calls() {
    let generator = Arc::new(ScriptedGenerator::new());
    let executor = Arc::new(ScriptedExecutor::new());
    let orch = orchestrator(generator.clone(), executor.clone(), 5);

    let state = orch.invoke(PipelineRequest::new("")).await;

    match &state.failure {
        Some(PipelineError::InputRejected { message, .. }) => {
            assert!(message.contains("empty"), "{}", message)
        }
        other => panic!("expected input rejection, got {:?}", other),
    }
    assert_eq!(generator.calls().total(), 0);
    assert_eq!(executor.calls(), 0);
    assert_eq!(
        state.stage_path(),
        vec![Stage::InputGate, Stage::Terminal(Outcome::Failure)]
    );
}

#[tokio::test]
async fn out_of_range_lengths_make_no_generative_calls() {
    for prompt in ["short".to_string(), "x".repeat(141)] {
        let generator = Arc::new(ScriptedGenerator::new());
        let orch = orchestrator(generator.clone(), Arc::new(ScriptedExecutor::new()), 5);
        let state = orch.invoke(PipelineRequest::new(prompt.as_str())).await;
        assert!(matches!(
            state.failure,
            Some(PipelineError::InputRejected { .. })
        ));
        assert_eq!(generator.calls().total(), 0, "prompt {:?}", prompt);
    }
}

#[tokio::test]
async fn vague_prompt_needs_clarification_with_suggestion() {
    let generator = Arc::new(ScriptedGenerator::new().classify_as(Classification {
        verdict: Verdict::NeedsClarification,
        explanation: "Too vague".to_string(),
        suggestion: None,
        reformulated_prompt: Some("What is the derivative of x^2?".to_string()),
    }));
    let orch = orchestrator(generator.clone(), Arc::new(ScriptedExecutor::new()), 5);

    let state = orch.invoke(PipelineRequest::new("math stuff??")).await;

    assert_eq!(state.gate, GateStatus::NeedsClarification);
    match &state.failure {
        Some(PipelineError::InputRejected {
            message,
            suggestion,
        }) => {
            assert!(message.contains("Did you mean"));
            assert!(message.contains("What is the derivative of x^2?"));
            assert!(suggestion.as_deref().is_some_and(|s| !s.is_empty()));
        }
        other => panic!("expected input rejection, got {:?}", other),
    }
    assert_eq!(generator.calls().classify, 1);
    assert_eq!(generator.calls().plan, 0);
}

#[tokio::test]
async fn invalid_prompt_reports_explanation() {
    let generator = Arc::new(ScriptedGenerator::new().classify_as(Classification {
        verdict: Verdict::Invalid,
        explanation: "Not a question about a concept".to_string(),
        suggestion: Some("Ask about a math or science idea".to_string()),
        reformulated_prompt: None,
    }));
    let orch = orchestrator(generator, Arc::new(ScriptedExecutor::new()), 5);

    let state = orch.invoke(PipelineRequest::new("buy cheap watches now")).await;

    assert_eq!(state.gate, GateStatus::Invalid);
    let text = state.error_text().unwrap();
    assert!(text.starts_with("We're having trouble understanding your request"));
    assert!(text.contains("Not a question about a concept"));
}

#[tokio::test]
async fn reformulated_prompt_drives_planning() {
    let generator = Arc::new(ScriptedGenerator::new().classify_as(Classification {
        verdict: Verdict::Valid,
        explanation: "ok".to_string(),
        suggestion: None,
        reformulated_prompt: Some("Why do a triangle's interior angles sum to 180°?".to_string()),
    }));
    let executor = Arc::new(ScriptedExecutor::new().succeeds("/media/t.mp4"));
    let orch = orchestrator(generator, executor, 5);

    let state = orch.invoke(PipelineRequest::new(PROMPT)).await;

    assert!(state.is_success());
    assert!(state.plan.unwrap().contains("interior angles"));
}

#[tokio::test]
async fn clean_run_renders_once() {
    let generator = Arc::new(ScriptedGenerator::new());
    let executor = Arc::new(ScriptedExecutor::new().succeeds("/media/triangle.mp4"));
    let orch = orchestrator(generator.clone(), executor.clone(), 5);

    let state = orch.invoke(PipelineRequest::new(PROMPT)).await;

    assert!(state.is_success(), "{:?}", state.failure);
    assert_eq!(state.attempts, 0);
    assert_eq!(state.output_locator(), Some("/media/triangle.mp4"));
    assert_eq!(executor.calls(), 1);
    assert_eq!(generator.calls().correct, 0);
    assert!(state.failure.is_none());
}

#[tokio::test]
async fn render_failure_runs_exactly_one_correction() {
    let corrected = REFERENCE_EXAMPLE.replace("SquareOfSum", "SquareOfSumFixed");
    let generator = Arc::new(ScriptedGenerator::new().corrects_to(&corrected));
    let executor = Arc::new(
        ScriptedExecutor::new()
            .fails("NameError: name 'Foo' is not defined")
            .succeeds("/media/fixed.mp4"),
    );
    let orch = orchestrator(generator.clone(), executor.clone(), 5);

    let state = orch.invoke(PipelineRequest::new(PROMPT)).await;

    assert!(state.is_success(), "{:?}", state.failure);
    assert_eq!(state.attempts, 1);
    assert_eq!(generator.calls().correct, 1);
    assert_eq!(executor.calls(), 2);
    assert!(executor.rendered()[1].contains("SquareOfSumFixed"));
    assert!(generator.correction_failures()[0].contains("NameError"));

    let path = state.stage_path();
    assert_eq!(count_edges(&path, Stage::Execute, Stage::Correct), 1);
    assert_eq!(count_edges(&path, Stage::Correct, Stage::Validate), 1);
    assert_eq!(count_edges(&path, Stage::Correct, Stage::Execute), 0);
}

#[tokio::test]
async fn persistent_render_failure_exhausts_budget_of_five() {
    let generator = Arc::new(ScriptedGenerator::new());
    let executor = Arc::new(ScriptedExecutor::new());
    let orch = orchestrator(generator.clone(), executor.clone(), 5);

    let state = orch.invoke(PipelineRequest::new(PROMPT)).await;

    assert_eq!(state.attempts, 5);
    assert_eq!(generator.calls().correct, 5, "no sixth correction call");
    assert_eq!(executor.calls(), 6);
    assert!(!state.is_success());
    assert!(state.output_locator().is_none());
    match state.failure {
        Some(PipelineError::BudgetExhausted { attempts, last_error }) => {
            assert_eq!(attempts, 5);
            assert!(last_error.contains("scripted render failure"));
        }
        other => panic!("expected budget exhaustion, got {:?}", other),
    }
}

#[tokio::test]
async fn static_failure_is_corrected_before_rendering() {
    let generator = Arc::new(ScriptedGenerator::new().generates(BROKEN_ARTIFACT));
    let executor = Arc::new(ScriptedExecutor::new().succeeds("/media/ok.mp4"));
    let orch = orchestrator(generator.clone(), executor.clone(), 5);

    let state = orch.invoke(PipelineRequest::new(PROMPT)).await;

    assert!(state.is_success());
    assert_eq!(state.attempts, 1);
    assert_eq!(executor.calls(), 1, "broken artifact never reaches the renderer");
    let failure = &generator.correction_failures()[0];
    assert!(failure.starts_with("Static validation failed"));
    assert!(failure.contains("from manim import *"));
    assert!(failure.contains("ManimVoiceoverBase"));
}

#[tokio::test]
async fn static_failures_exhaust_budget_without_rendering() {
    let generator = Arc::new(
        ScriptedGenerator::new()
            .generates(BROKEN_ARTIFACT)
            .corrects_to(BROKEN_ARTIFACT)
            .corrects_to(BROKEN_ARTIFACT),
    );
    let executor = Arc::new(ScriptedExecutor::new());
    let orch = orchestrator(generator.clone(), executor.clone(), 2);

    let state = orch.invoke(PipelineRequest::new(PROMPT)).await;

    assert_eq!(state.attempts, 2);
    assert_eq!(generator.calls().correct, 2);
    assert_eq!(executor.calls(), 0);
    assert!(matches!(
        state.failure,
        Some(PipelineError::BudgetExhausted { attempts: 2, .. })
    ));
}

#[tokio::test]
async fn generation_fault_routes_to_correction() {
    let generator = Arc::new(ScriptedGenerator::new().generation_fault("model timeout"));
    let executor = Arc::new(ScriptedExecutor::new().succeeds("/media/ok.mp4"));
    let orch = orchestrator(generator.clone(), executor, 5);

    let state = orch.invoke(PipelineRequest::new(PROMPT)).await;

    assert!(state.is_success());
    assert_eq!(state.attempts, 1);
    let failure = &generator.correction_failures()[0];
    assert!(
        failure.contains("Code generation failed: model timeout"),
        "{}",
        failure
    );
}

#[tokio::test]
async fn planning_fault_is_terminal() {
    let generator = Arc::new(ScriptedGenerator::new().plan_fault("planner offline"));
    let orch = orchestrator(generator.clone(), Arc::new(ScriptedExecutor::new()), 5);

    let state = orch.invoke(PipelineRequest::new(PROMPT)).await;

    assert!(matches!(state.failure, Some(PipelineError::PlanningFailed(_))));
    assert_eq!(generator.calls().generate, 0);
}

#[tokio::test]
async fn correction_fault_counts_the_attempt_and_stops() {
    let generator = Arc::new(ScriptedGenerator::new().correction_fault("context window exceeded"));
    let executor = Arc::new(ScriptedExecutor::new());
    let orch = orchestrator(generator.clone(), executor.clone(), 5);

    let state = orch.invoke(PipelineRequest::new(PROMPT)).await;

    assert_eq!(state.attempts, 1);
    assert_eq!(executor.calls(), 1);
    match state.failure {
        Some(PipelineError::CorrectionFailed(reason)) => {
            assert!(reason.contains("context window exceeded"))
        }
        other => panic!("expected correction failure, got {:?}", other),
    }
}

#[tokio::test]
async fn classifier_outage_fails_open_by_default() {
    let generator = Arc::new(ScriptedGenerator::new().classifier_down("503"));
    let executor = Arc::new(ScriptedExecutor::new().succeeds("/media/ok.mp4"));
    let orch = orchestrator(generator, executor, 5);

    let state = orch.invoke(PipelineRequest::new(PROMPT)).await;

    assert_eq!(state.gate, GateStatus::Valid);
    assert!(state.is_success());
}

#[tokio::test]
async fn classifier_outage_rejects_when_fail_closed() {
    let generator = Arc::new(ScriptedGenerator::new().classifier_down("503"));
    let config = PipelineConfig {
        fail_open_on_classifier_error: false,
        ..PipelineConfig::default()
    };
    let orch = Orchestrator::new(
        generator.clone(),
        Arc::new(ScriptedExecutor::new()),
        &config,
        JobLoggerFactory::tracing_only(),
    );

    let state = orch.invoke(PipelineRequest::new(PROMPT)).await;

    assert!(matches!(
        state.failure,
        Some(PipelineError::InputRejected { .. })
    ));
    assert_eq!(generator.calls().plan, 0);
}

#[tokio::test]
async fn job_log_file_ends_with_one_terminal_entry() {
    let dir = TempDir::new().unwrap();
    let generator = Arc::new(ScriptedGenerator::new());
    let executor = Arc::new(ScriptedExecutor::new().fails("boom").succeeds("/media/ok.mp4"));
    let loggers = JobLoggerFactory::new(Some(dir.path().to_path_buf()));
    let orch = orchestrator_with(generator, executor, 5, loggers);

    let state = orch.invoke_job("job-42", PipelineRequest::new(PROMPT)).await;
    assert!(state.is_success());

    let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
    let path = entries[0].as_ref().unwrap().path();
    assert!(path.to_string_lossy().ends_with("_job-42.jsonl"));

    let lines: Vec<serde_json::Value> = std::fs::read_to_string(&path)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    let ends: Vec<_> = lines.iter().filter(|l| l["stage"] == "end").collect();
    assert_eq!(ends.len(), 1);
    assert_eq!(ends[0]["level"], "INFO");
    assert!(lines.iter().all(|l| l["job_id"] == "job-42"));
    assert!(lines.iter().any(|l| l["stage"] == "correct"));
}
