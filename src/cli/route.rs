//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use crate::artifact::{inspect, RuleSet};
use crate::cli::command_name;
use crate::cli::parse::Commands;
use crate::cli::presentation::{
    format_check_report_json, format_check_report_text, format_job_json, format_job_list_json,
    format_job_list_text, format_job_text, format_run_result_json, format_run_result_text,
};
use crate::config::{ConfigLoader, LeapConfig};
use crate::error::ApiError;
use crate::generation;
use crate::jobs::{JobService, JobStore, SledJobStore};
use crate::logging::JobLoggerFactory;
use crate::pipeline::{transition, Orchestrator, PipelineRequest};
use crate::sandbox::RenderSandbox;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Runtime context for CLI execution: workspace and resolved configuration.
/// Services are built per command so `check` and `workflow` need no provider.
pub struct RunContext {
    workspace_root: PathBuf,
    config: LeapConfig,
    store: Mutex<Option<Arc<SledJobStore>>>,
}

impl RunContext {
    /// Create run context from workspace root and optional config path. Uses ConfigLoader only.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };
        Ok(Self::with_config(workspace_root, config))
    }

    pub fn with_config(workspace_root: PathBuf, config: LeapConfig) -> Self {
        Self {
            workspace_root,
            config,
            store: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &LeapConfig {
        &self.config
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        let started = Instant::now();
        let name = command_name(command);
        debug!(command = name, "Dispatching command");
        let result = self.execute_inner(command);
        info!(
            command = name,
            ok = result.is_ok(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        result
    }

    fn execute_inner(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Run {
                prompt,
                level,
                quality,
                voice,
                contact,
                format,
            } => {
                let request = PipelineRequest::new(prompt.clone())
                    .with_level(*level)
                    .with_quality(*quality)
                    .with_voice(voice.clone())
                    .with_contact(contact.clone());
                self.handle_run(request, format)
            }
            Commands::Status { job_id, format } => {
                let record = self.open_store()?.get(job_id).map_err(|e| match e {
                    crate::error::StorageError::JobNotFound(id) => ApiError::JobNotFound(id),
                    other => ApiError::StorageError(other),
                })?;
                if format == "json" {
                    format_job_json(&record)
                } else {
                    Ok(format_job_text(&record))
                }
            }
            Commands::Jobs { limit, format } => {
                let mut records = self.open_store()?.list()?;
                records.truncate(*limit);
                if format == "json" {
                    format_job_list_json(&records)
                } else {
                    Ok(format_job_list_text(&records))
                }
            }
            Commands::Check { file, format } => {
                let text = std::fs::read_to_string(file)?;
                let report = inspect(&text, &RuleSet::new());
                if format == "json" {
                    format_check_report_json(file, &report)
                } else {
                    Ok(format_check_report_text(file, &report))
                }
            }
            Commands::Workflow => Ok(transition::mermaid()),
        }
    }

    fn handle_run(&self, request: PipelineRequest, format: &str) -> Result<String, ApiError> {
        let service = self.build_service()?;
        let rt = tokio::runtime::Runtime::new()?;
        let outcome = rt.block_on(service.run_to_completion(request))?;

        let code_dir = &self.config.sandbox.code_dir;
        let summary = if format == "json" {
            format_run_result_json(&outcome, code_dir)?
        } else {
            format_run_result_text(&outcome, code_dir)
        };
        if !outcome.state.is_success() {
            return Err(ApiError::JobFailed {
                job_id: outcome.record.id.clone(),
                message: outcome
                    .record
                    .error
                    .clone()
                    .unwrap_or_else(|| "Unknown error".to_string()),
                summary,
            });
        }
        Ok(summary)
    }

    /// The job store, opened on first use and shared by later commands.
    fn open_store(&self) -> Result<Arc<SledJobStore>, ApiError> {
        let mut slot = self.store.lock();
        if let Some(store) = slot.as_ref() {
            return Ok(Arc::clone(store));
        }
        let store = Arc::new(SledJobStore::open(&self.config.storage.job_store_path)?);
        *slot = Some(Arc::clone(&store));
        Ok(store)
    }

    /// Full job service for the loaded configuration.
    pub fn build_service(&self) -> Result<JobService, ApiError> {
        self.config.validate().map_err(|errors| {
            ApiError::ConfigError(
                errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        })?;

        let generator = generation::from_config(&self.config.provider)?;
        let executor = Arc::new(RenderSandbox::new(self.config.sandbox.clone()));
        let loggers = JobLoggerFactory::new(self.config.storage.log_dir.clone());
        let orchestrator = Arc::new(Orchestrator::new(
            generator,
            executor,
            &self.config.pipeline,
            loggers,
        ));
        let store: Arc<dyn JobStore> = self.open_store()?;
        Ok(JobService::new(orchestrator, store))
    }
}
