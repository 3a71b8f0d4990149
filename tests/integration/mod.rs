//! Integration tests for the Leap animation pipeline

mod pipeline_flow;
mod sandbox_process;
mod support;
mod test_utils;
