//! In-memory job store for the fallback backend.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use tracing::debug;

use super::error::JobError;
use super::store::{truncate_message, JobStore};
use super::types::{InsightListFilter, Job, JobStatus, ERROR_MESSAGE_CAP};

/// Bounded in-memory job table.
///
/// When full, the oldest terminal job is evicted to make room; pending
/// and running jobs are never evicted, so a table full of live jobs
/// rejects new inserts instead.
pub struct MemoryJobStore {
    jobs: Mutex<HashMap<String, Job>>,
    cap: usize,
}

impl MemoryJobStore {
    pub fn new(cap: usize) -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            cap: cap.max(1),
        }
    }

    fn update<F>(&self, job_id: &str, apply: F) -> Result<(), JobError>
    where
        F: FnOnce(&mut Job),
    {
        let mut jobs = self.jobs.lock().unwrap();
        match jobs.get_mut(job_id) {
            Some(job) if job.status.is_terminal() => {
                debug!(job_id, status = job.status.as_str(), "ignoring write to terminal job");
                Ok(())
            }
            Some(job) => {
                apply(job);
                job.updated_at = Utc::now();
                Ok(())
            }
            None => Err(JobError::NotFound(job_id.to_string())),
        }
    }
}

impl JobStore for MemoryJobStore {
    fn insert(&self, job: &Job) -> Result<(), JobError> {
        let mut jobs = self.jobs.lock().unwrap();
        if jobs.len() >= self.cap {
            let evict = jobs
                .values()
                .filter(|j| j.status.is_terminal())
                .min_by_key(|j| j.finished_at.unwrap_or(j.created_at))
                .map(|j| j.job_id.clone());
            match evict {
                Some(id) => {
                    debug!(evicted = %id, "job table full, evicting oldest terminal job");
                    jobs.remove(&id);
                }
                None => {
                    return Err(JobError::Store(format!(
                        "job table full ({} live jobs)",
                        jobs.len()
                    )));
                }
            }
        }
        jobs.insert(job.job_id.clone(), job.clone());
        Ok(())
    }

    fn get(&self, job_id: &str) -> Result<Option<Job>, JobError> {
        Ok(self.jobs.lock().unwrap().get(job_id).cloned())
    }

    fn set_queue_ref(&self, job_id: &str, queue_ref: &str) -> Result<(), JobError> {
        self.update(job_id, |job| {
            job.queue_ref = Some(queue_ref.to_string());
        })
    }

    fn mark_running(&self, job_id: &str) -> Result<(), JobError> {
        self.update(job_id, |job| {
            job.status = JobStatus::Running;
            job.started_at = Some(Utc::now());
        })
    }

    fn mark_success(&self, job_id: &str, result: &serde_json::Value) -> Result<(), JobError> {
        self.update(job_id, |job| {
            job.status = JobStatus::Success;
            job.result = Some(result.clone());
            job.finished_at = Some(Utc::now());
        })
    }

    fn mark_failed(&self, job_id: &str, error_message: &str) -> Result<(), JobError> {
        self.update(job_id, |job| {
            job.status = JobStatus::Failed;
            job.error_message = Some(truncate_message(error_message, ERROR_MESSAGE_CAP));
            job.finished_at = Some(Utc::now());
        })
    }

    fn list_insight(
        &self,
        filter: &InsightListFilter,
        operator: Option<&str>,
    ) -> Result<Vec<Job>, JobError> {
        let jobs = self.jobs.lock().unwrap();
        let scoped = jobs
            .values()
            .filter(|j| operator.map_or(true, |op| j.operator == op))
            .cloned();
        Ok(filter.apply(scoped))
    }
}
