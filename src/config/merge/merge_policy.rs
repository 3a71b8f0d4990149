//! Merge rules: defaults, override order, conflict handling.
//!
//! Later sources win key by key; tables are merged, not replaced.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("pipeline.attempt_budget", 5)?
        .set_default("pipeline.min_prompt_chars", 10)?
        .set_default("pipeline.max_prompt_chars", 140)?
        .set_default("pipeline.fail_open_on_classifier_error", true)?
        .set_default("sandbox.timeout_secs", 180)?
        .set_default("sandbox.max_concurrent_renders", 2)?
        .set_default("storage.job_store_path", ".leap/jobs")?
        .set_default("storage.log_dir", ".leap/logs")
}
