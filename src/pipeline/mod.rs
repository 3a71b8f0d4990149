//! Bounded-retry animation pipeline.

pub mod gate;
pub mod orchestrator;
pub mod stages;
pub mod state;
pub mod transition;

pub use gate::InputGate;
pub use orchestrator::Orchestrator;
pub use state::{
    GateStatus, Outcome, PipelineRequest, PipelineState, Stage, Transition, DEFAULT_VOICE,
};
