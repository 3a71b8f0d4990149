//! Completion notices.

use crate::error::DeliveryError;
use async_trait::async_trait;
use tracing::info;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_completed(
        &self,
        contact: &str,
        job_id: &str,
        output_locator: &str,
    ) -> Result<(), DeliveryError>;
}

/// Writes the notice to the process log instead of delivering it.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_completed(
        &self,
        contact: &str,
        job_id: &str,
        output_locator: &str,
    ) -> Result<(), DeliveryError> {
        info!(contact, job_id, output_locator, "Animation ready");
        Ok(())
    }
}
