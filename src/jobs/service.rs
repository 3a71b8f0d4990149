//! Job service: accepts requests, runs them in the background and keeps the job
//! record current. Post-success side effects fail soft.

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use super::notify::{LogNotifier, Notifier};
use super::publish::{LocalPublisher, OutputPublisher};
use super::record::{JobRecord, JobStatus};
use super::store::JobStore;
use crate::error::{ApiError, StorageError};
use crate::pipeline::{Orchestrator, PipelineRequest, PipelineState};

/// Final record plus the terminal pipeline state of one run.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub record: JobRecord,
    pub state: PipelineState,
}

#[derive(Clone)]
pub struct JobService {
    orchestrator: Arc<Orchestrator>,
    store: Arc<dyn JobStore>,
    publisher: Arc<dyn OutputPublisher>,
    notifier: Arc<dyn Notifier>,
}

impl JobService {
    pub fn new(orchestrator: Arc<Orchestrator>, store: Arc<dyn JobStore>) -> Self {
        Self {
            orchestrator,
            store,
            publisher: Arc::new(LocalPublisher),
            notifier: Arc::new(LogNotifier),
        }
    }

    pub fn with_publisher(self, publisher: Arc<dyn OutputPublisher>) -> Self {
        Self { publisher, ..self }
    }

    pub fn with_notifier(self, notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier, ..self }
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Record the job and run it on a background task. Returns the job id at once.
    pub fn submit(&self, request: PipelineRequest) -> Result<String, ApiError> {
        let job_id = Uuid::new_v4().to_string();
        self.store.create(&job_id, &request)?;
        info!(job_id = %job_id, "Job accepted");

        let service = self.clone();
        let task_id = job_id.clone();
        tokio::spawn(async move {
            if let Err(e) = service.run_job(&task_id, request).await {
                error!(job_id = %task_id, error = %e, "Job record could not be updated");
                service.mark_failed(&task_id, &e);
            }
        });
        Ok(job_id)
    }

    pub fn get_status(&self, job_id: &str) -> Result<JobRecord, ApiError> {
        self.store.get(job_id).map_err(|e| match e {
            StorageError::JobNotFound(id) => ApiError::JobNotFound(id),
            other => ApiError::StorageError(other),
        })
    }

    /// Record and run a job on the caller's task.
    pub async fn run_to_completion(&self, request: PipelineRequest) -> Result<JobOutcome, ApiError> {
        let job_id = Uuid::new_v4().to_string();
        self.store.create(&job_id, &request)?;
        self.run_job(&job_id, request).await
    }

    async fn run_job(&self, job_id: &str, request: PipelineRequest) -> Result<JobOutcome, ApiError> {
        self.store
            .update(job_id, JobStatus::Processing, None, None)?;
        let contact = request.contact.clone();
        let state = self.orchestrator.invoke_job(job_id, request).await;

        let record = match state.output_locator() {
            Some(local) if state.is_success() => {
                let locator = self.publish(job_id, local).await;
                let record =
                    self.store
                        .update(job_id, JobStatus::Completed, Some(locator.clone()), None)?;
                if let Some(contact) = contact.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
                    self.notify(contact, job_id, &locator).await;
                }
                record
            }
            _ => {
                let error = state
                    .error_text()
                    .unwrap_or_else(|| "Rendering finished without an output file".to_string());
                self.store
                    .update(job_id, JobStatus::Failed, None, Some(error))?
            }
        };
        Ok(JobOutcome { record, state })
    }

    /// Best effort so pollers still see a terminal status.
    fn mark_failed(&self, job_id: &str, cause: &ApiError) {
        if let Err(e) = self
            .store
            .update(job_id, JobStatus::Failed, None, Some(cause.to_string()))
        {
            error!(job_id, error = %e, "Job left without a terminal status");
        }
    }

    async fn publish(&self, job_id: &str, local: &str) -> String {
        match self.publisher.publish(job_id, Path::new(local)).await {
            Ok(locator) => locator,
            Err(e) => {
                warn!(job_id, error = %e, "Keeping local output path");
                local.to_string()
            }
        }
    }

    async fn notify(&self, contact: &str, job_id: &str, locator: &str) {
        if let Err(e) = self.notifier.notify_completed(contact, job_id, locator).await {
            warn!(job_id, error = %e, "Completion notice not delivered");
        }
    }
}
