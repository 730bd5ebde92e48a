//! Job execution backends.

use async_trait::async_trait;
use regex_lite::Regex;
use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::Identity;
use crate::pipeline::{PipelineError, RefreshPipeline};

use super::broker::{DispatchMessage, JobBroker};
use super::error::JobError;
use super::executor::{run_job, JobExecutor};
use super::store::JobStore;
use super::types::{InsightListFilter, Job, JobRequest, ALLOWED_RANGE_DAYS};

/// Submission and owner-scoped reads over a job store.
///
/// Both implementations validate synchronously: a rejected request leaves
/// no job record behind.
#[async_trait]
pub trait JobBackend: Send + Sync {
    async fn submit(&self, request: JobRequest, requester: &Identity) -> Result<Job, JobError>;

    /// Fetch one job; only the submitting operator and admins may read it.
    async fn get(&self, job_id: &str, requester: &Identity) -> Result<Job, JobError>;

    /// List insight jobs; operators see their own, admins see everyone's.
    async fn list_insight(
        &self,
        filter: &InsightListFilter,
        requester: &Identity,
    ) -> Result<Vec<Job>, JobError>;
}

fn check_access(job: Job, requester: &Identity) -> Result<Job, JobError> {
    if requester.role.is_admin() || job.operator == requester.user_id {
        Ok(job)
    } else {
        Err(JobError::AccessDenied)
    }
}

fn operator_scope<'a>(requester: &'a Identity) -> Option<&'a str> {
    if requester.role.is_admin() {
        None
    } else {
        Some(requester.user_id.as_str())
    }
}

/// Validate a request against the live roster and the allowed windows.
/// Returns the request with the asin normalized.
fn validate(
    request: JobRequest,
    pipeline: &RefreshPipeline,
    insight_enabled: bool,
) -> Result<JobRequest, JobError> {
    match request {
        JobRequest::Refresh { site } => {
            // An undersupplied roster fails here, before any record exists.
            match pipeline.resolve_roster(site) {
                Ok(_) => Ok(JobRequest::Refresh { site }),
                Err(PipelineError::Undersupply { site, have, need }) => {
                    Err(JobError::Undersupply { site, have, need })
                }
                Err(e) => Err(e.into()),
            }
        }
        JobRequest::Insight {
            site,
            asin,
            range_days,
        } => {
            if !insight_enabled {
                return Err(JobError::Validation(
                    "insight generation is not configured".to_string(),
                ));
            }
            let asin = asin.trim().to_ascii_uppercase();
            let well_formed = Regex::new(r"^[A-Z0-9]{10}$")
                .map(|re| re.is_match(&asin))
                .unwrap_or(false);
            if !well_formed {
                return Err(JobError::Validation(format!(
                    "malformed asin: {asin:?}"
                )));
            }
            if !ALLOWED_RANGE_DAYS.contains(&range_days) {
                return Err(JobError::Validation(format!(
                    "range_days must be one of {ALLOWED_RANGE_DAYS:?}, got {range_days}"
                )));
            }
            Ok(JobRequest::Insight {
                site,
                asin,
                range_days,
            })
        }
    }
}

/// Executes jobs on spawned tasks against a bounded in-memory table. Used
/// when no queue is configured; job history does not survive a restart.
pub struct FallbackBackend {
    store: Arc<dyn JobStore>,
    executor: Arc<JobExecutor>,
    pipeline: Arc<RefreshPipeline>,
}

impl FallbackBackend {
    pub fn new(
        store: Arc<dyn JobStore>,
        executor: Arc<JobExecutor>,
        pipeline: Arc<RefreshPipeline>,
    ) -> Self {
        Self {
            store,
            executor,
            pipeline,
        }
    }
}

#[async_trait]
impl JobBackend for FallbackBackend {
    async fn submit(&self, request: JobRequest, requester: &Identity) -> Result<Job, JobError> {
        let request = validate(request, &self.pipeline, self.executor.insight_enabled())?;
        let job = Job::new(&request, &requester.user_id);
        self.store.insert(&job)?;
        info!(
            job_id = %job.job_id,
            kind = job.kind.as_str(),
            site = job.site.as_str(),
            "job accepted on fallback backend"
        );

        let store = self.store.clone();
        let executor = self.executor.clone();
        let job_id = job.job_id.clone();
        tokio::spawn(run_job(store, executor, job_id));

        Ok(job)
    }

    async fn get(&self, job_id: &str, requester: &Identity) -> Result<Job, JobError> {
        let job = self
            .store
            .get(job_id)?
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;
        check_access(job, requester)
    }

    async fn list_insight(
        &self,
        filter: &InsightListFilter,
        requester: &Identity,
    ) -> Result<Vec<Job>, JobError> {
        self.store.list_insight(filter, operator_scope(requester))
    }
}

/// Persists jobs in SQLite and hands execution to workers through a
/// broker. Dispatch failures mark the job failed before surfacing.
pub struct DurableBackend {
    store: Arc<dyn JobStore>,
    broker: Arc<dyn JobBroker>,
    pipeline: Arc<RefreshPipeline>,
    insight_enabled: bool,
}

impl DurableBackend {
    pub fn new(
        store: Arc<dyn JobStore>,
        broker: Arc<dyn JobBroker>,
        pipeline: Arc<RefreshPipeline>,
        insight_enabled: bool,
    ) -> Self {
        Self {
            store,
            broker,
            pipeline,
            insight_enabled,
        }
    }
}

#[async_trait]
impl JobBackend for DurableBackend {
    async fn submit(&self, request: JobRequest, requester: &Identity) -> Result<Job, JobError> {
        let request = validate(request, &self.pipeline, self.insight_enabled)?;
        let job = Job::new(&request, &requester.user_id);
        self.store.insert(&job)?;

        let message = DispatchMessage::new(&job.job_id);
        if let Err(e) = self.broker.dispatch(&message).await {
            warn!(job_id = %job.job_id, error = %e, "dispatch failed, failing job");
            self.store
                .mark_failed(&job.job_id, &format!("dispatch failed: {e}"))?;
            return Err(e);
        }
        self.store.set_queue_ref(&job.job_id, &message.dispatch_id)?;
        info!(
            job_id = %job.job_id,
            dispatch_id = %message.dispatch_id,
            kind = job.kind.as_str(),
            "job dispatched to queue"
        );

        let mut job = job;
        job.queue_ref = Some(message.dispatch_id);
        Ok(job)
    }

    async fn get(&self, job_id: &str, requester: &Identity) -> Result<Job, JobError> {
        let job = self
            .store
            .get(job_id)?
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;
        check_access(job, requester)
    }

    async fn list_insight(
        &self,
        filter: &InsightListFilter,
        requester: &Identity,
    ) -> Result<Vec<Job>, JobError> {
        self.store.list_insight(filter, operator_scope(requester))
    }
}
