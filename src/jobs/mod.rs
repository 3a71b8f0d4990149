//! Job records, their persistence and the service that runs pipelines for them.

pub mod notify;
pub mod publish;
pub mod record;
pub mod service;
pub mod store;

pub use notify::{LogNotifier, Notifier};
pub use publish::{LocalPublisher, OutputPublisher};
pub use record::{JobRecord, JobStatus};
pub use service::{JobOutcome, JobService};
pub use store::{JobStore, MemoryJobStore, SledJobStore};
