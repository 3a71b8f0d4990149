//! Configuration loading facade.

use super::merge::merge_policy;
use super::sources::{environment, global_file, workspace_file};
use super::LeapConfig;
use config::{ConfigError, File};
use std::path::Path;
use tracing::debug;

/// Loads `LeapConfig` from the layered sources.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults < global file < workspace files < environment.
    /// Relative paths in the result are anchored at `workspace_root`.
    pub fn load(workspace_root: &Path) -> Result<LeapConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = environment::add_to_builder(builder);

        let mut config: LeapConfig = builder.build()?.try_deserialize()?;
        config.resolve_paths(workspace_root);
        debug!(workspace = %workspace_root.display(), "Configuration loaded");
        Ok(config)
    }

    /// Defaults < the given file. Relative paths are anchored at the file's directory.
    pub fn load_from_file(path: &Path) -> Result<LeapConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?
            .add_source(File::from(path).required(true));
        let mut config: LeapConfig = builder.build()?.try_deserialize()?;
        if let Some(dir) = path.parent() {
            config.resolve_paths(dir);
        }
        Ok(config)
    }

    /// Built-in defaults only.
    pub fn default() -> LeapConfig {
        LeapConfig::default()
    }
}
