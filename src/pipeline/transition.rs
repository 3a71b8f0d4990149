//! Stage transition table.
//!
//! `next` is pure: it reads the state a stage returned and picks the following stage.
//! Corrections always re-enter validation, never execution.

use super::state::{GateStatus, Outcome, PipelineState, Stage};

pub fn next(stage: Stage, state: &PipelineState, budget: u32) -> Stage {
    match stage {
        Stage::InputGate => match state.gate {
            GateStatus::Valid => Stage::Plan,
            GateStatus::Pending | GateStatus::NeedsClarification | GateStatus::Invalid => {
                Stage::Terminal(Outcome::Failure)
            }
        },
        Stage::Plan => {
            if state.failure.is_none() && state.plan.is_some() {
                Stage::Generate
            } else {
                Stage::Terminal(Outcome::Failure)
            }
        }
        Stage::Generate => Stage::Validate,
        Stage::Validate => {
            if state.error.is_none() && state.artifact.is_some() {
                Stage::Execute
            } else {
                Stage::Correct
            }
        }
        Stage::Execute => {
            if state.execution_succeeded() {
                Stage::Terminal(Outcome::Success)
            } else if state.attempts < budget {
                Stage::Correct
            } else {
                Stage::Terminal(Outcome::Failure)
            }
        }
        Stage::Correct => {
            if state.failure.is_none() && state.attempts <= budget {
                Stage::Validate
            } else {
                Stage::Terminal(Outcome::Failure)
            }
        }
        Stage::Terminal(outcome) => Stage::Terminal(outcome),
    }
}

/// Every edge of the table, for documentation output.
pub const EDGES: &[(Stage, &str, Stage)] = &[
    (Stage::InputGate, "valid", Stage::Plan),
    (
        Stage::InputGate,
        "invalid / needs clarification",
        Stage::Terminal(Outcome::Failure),
    ),
    (Stage::Plan, "ok", Stage::Generate),
    (Stage::Plan, "fault", Stage::Terminal(Outcome::Failure)),
    (Stage::Generate, "always", Stage::Validate),
    (Stage::Validate, "no error findings", Stage::Execute),
    (Stage::Validate, "error findings", Stage::Correct),
    (Stage::Execute, "success", Stage::Terminal(Outcome::Success)),
    (Stage::Execute, "failure, attempts < budget", Stage::Correct),
    (
        Stage::Execute,
        "failure, attempts >= budget",
        Stage::Terminal(Outcome::Failure),
    ),
    (Stage::Correct, "attempts <= budget", Stage::Validate),
    (
        Stage::Correct,
        "budget exhausted / correction fault",
        Stage::Terminal(Outcome::Failure),
    ),
];

/// Mermaid state diagram of the transition table.
pub fn mermaid() -> String {
    let mut out = String::from("stateDiagram-v2\n    [*] --> input_gate\n");
    for (from, label, to) in EDGES {
        out.push_str(&format!("    {} --> {}: {}\n", from, to, label));
    }
    out.push_str("    success --> [*]\n    failure --> [*]\n");
    out
}
