//! Job record persistence: a sled-backed store for the CLI and an in-memory one
//! for embedding and tests.

use std::collections::HashMap;
use std::io;
use std::path::Path;

use chrono::Utc;
use parking_lot::RwLock;
use sled::{Db, Tree};

use super::record::{JobRecord, JobStatus};
use crate::error::StorageError;
use crate::pipeline::PipelineRequest;

const TREE_JOBS: &str = "jobs";

pub trait JobStore: Send + Sync {
    /// Persist a fresh pending record for `request` under `id`.
    fn create(&self, id: &str, request: &PipelineRequest) -> Result<JobRecord, StorageError>;

    /// Move a job to `status`, recording its locator or error.
    fn update(
        &self,
        id: &str,
        status: JobStatus,
        output_locator: Option<String>,
        error: Option<String>,
    ) -> Result<JobRecord, StorageError>;

    fn get(&self, id: &str) -> Result<JobRecord, StorageError>;

    /// All records, newest first.
    fn list(&self) -> Result<Vec<JobRecord>, StorageError>;
}

fn apply_update(
    mut record: JobRecord,
    status: JobStatus,
    output_locator: Option<String>,
    error: Option<String>,
) -> Result<JobRecord, StorageError> {
    if !record.status.can_transition_to(status) {
        return Err(StorageError::InvalidTransition {
            job_id: record.id,
            from: record.status.to_string(),
            to: status.to_string(),
        });
    }
    record.status = status;
    if output_locator.is_some() {
        record.output_locator = output_locator;
    }
    if error.is_some() {
        record.error = error;
    }
    if status.is_terminal() && record.completed_at.is_none() {
        record.completed_at = Some(Utc::now());
    }
    Ok(record)
}

#[derive(Clone)]
pub struct SledJobStore {
    db: Db,
    jobs: Tree,
}

impl SledJobStore {
    pub fn new(db: Db) -> Result<Self, StorageError> {
        let jobs = db.open_tree(TREE_JOBS).map_err(to_storage_io)?;
        Ok(Self { db, jobs })
    }

    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = sled::open(path).map_err(to_storage_io)?;
        Self::new(db)
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush().map_err(to_storage_io)?;
        Ok(())
    }

    fn put(&self, record: &JobRecord) -> Result<(), StorageError> {
        let value = serde_json::to_vec(record).map_err(to_storage_data)?;
        self.jobs
            .insert(record.id.as_bytes(), value)
            .map_err(to_storage_io)?;
        self.flush()
    }

    fn load(&self, id: &str) -> Result<Option<JobRecord>, StorageError> {
        let Some(raw) = self.jobs.get(id.as_bytes()).map_err(to_storage_io)? else {
            return Ok(None);
        };
        let parsed = serde_json::from_slice(&raw).map_err(to_storage_data)?;
        Ok(Some(parsed))
    }
}

impl JobStore for SledJobStore {
    fn create(&self, id: &str, request: &PipelineRequest) -> Result<JobRecord, StorageError> {
        if let Some(existing) = self.load(id)? {
            return Ok(existing);
        }
        let record = JobRecord::pending(id, request);
        self.put(&record)?;
        Ok(record)
    }

    fn update(
        &self,
        id: &str,
        status: JobStatus,
        output_locator: Option<String>,
        error: Option<String>,
    ) -> Result<JobRecord, StorageError> {
        let current = self.get(id)?;
        let record = apply_update(current, status, output_locator, error)?;
        self.put(&record)?;
        Ok(record)
    }

    fn get(&self, id: &str) -> Result<JobRecord, StorageError> {
        self.load(id)?
            .ok_or_else(|| StorageError::JobNotFound(id.to_string()))
    }

    fn list(&self) -> Result<Vec<JobRecord>, StorageError> {
        let mut out = Vec::new();
        for result in self.jobs.iter() {
            let (_, value) = result.map_err(to_storage_io)?;
            let record: JobRecord = serde_json::from_slice(&value).map_err(to_storage_data)?;
            out.push(record);
        }
        out.sort_by_key(|r| std::cmp::Reverse(r.created_at));
        Ok(out)
    }
}

#[derive(Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<String, JobRecord>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStore for MemoryJobStore {
    fn create(&self, id: &str, request: &PipelineRequest) -> Result<JobRecord, StorageError> {
        let mut jobs = self.jobs.write();
        let record = jobs
            .entry(id.to_string())
            .or_insert_with(|| JobRecord::pending(id, request));
        Ok(record.clone())
    }

    fn update(
        &self,
        id: &str,
        status: JobStatus,
        output_locator: Option<String>,
        error: Option<String>,
    ) -> Result<JobRecord, StorageError> {
        let mut jobs = self.jobs.write();
        let current = jobs
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::JobNotFound(id.to_string()))?;
        let record = apply_update(current, status, output_locator, error)?;
        jobs.insert(id.to_string(), record.clone());
        Ok(record)
    }

    fn get(&self, id: &str) -> Result<JobRecord, StorageError> {
        self.jobs
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::JobNotFound(id.to_string()))
    }

    fn list(&self) -> Result<Vec<JobRecord>, StorageError> {
        let mut out: Vec<JobRecord> = self.jobs.read().values().cloned().collect();
        out.sort_by_key(|r| std::cmp::Reverse(r.created_at));
        Ok(out)
    }
}

fn to_storage_io(err: sled::Error) -> StorageError {
    StorageError::IoError(io::Error::new(io::ErrorKind::Other, err.to_string()))
}

fn to_storage_data(err: serde_json::Error) -> StorageError {
    StorageError::Corrupt(err.to_string())
}
