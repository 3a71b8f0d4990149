//! Leap: Explanatory Animation Pipeline
//!
//! Turns a natural-language question into a rendered, narrated animation. A request
//! passes an input gate, is planned and generated by a generative model, statically
//! validated, rendered in a sandboxed subprocess and, on failure, corrected and
//! retried within a fixed budget.

pub mod artifact;
pub mod cli;
pub mod config;
pub mod error;
pub mod generation;
pub mod jobs;
pub mod logging;
pub mod naming;
pub mod pipeline;
pub mod provider;
pub mod sandbox;
