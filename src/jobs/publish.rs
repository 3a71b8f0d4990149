//! Output publishing after a successful render.

use crate::error::DeliveryError;
use async_trait::async_trait;
use std::path::Path;

#[async_trait]
pub trait OutputPublisher: Send + Sync {
    /// Make the rendered file at `local` available and return its public locator.
    async fn publish(&self, job_id: &str, local: &Path) -> Result<String, DeliveryError>;
}

/// Publishes in place: the locator is the file's absolute path.
#[derive(Debug, Clone, Default)]
pub struct LocalPublisher;

#[async_trait]
impl OutputPublisher for LocalPublisher {
    async fn publish(&self, _job_id: &str, local: &Path) -> Result<String, DeliveryError> {
        let absolute = tokio::fs::canonicalize(local)
            .await
            .map_err(|e| DeliveryError::Publish(format!("{}: {}", local.display(), e)))?;
        Ok(absolute.to_string_lossy().into_owned())
    }
}
