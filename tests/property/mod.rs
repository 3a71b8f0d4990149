//! Property-based tests for artifact canonicalization and entry-point resolution

mod entry_point;
mod normalization;
