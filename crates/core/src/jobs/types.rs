//! Job domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::telemetry::SiteCode;

/// Analysis windows a telemetry insight may cover, in days.
pub const ALLOWED_RANGE_DAYS: [u32; 4] = [7, 30, 90, 180];

/// Failure messages stored on a job are capped at this many chars.
pub const ERROR_MESSAGE_CAP: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Refresh,
    Insight,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Refresh => "refresh",
            JobKind::Insight => "insight",
        }
    }
}

impl std::str::FromStr for JobKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "refresh" => Ok(JobKind::Refresh),
            "insight" => Ok(JobKind::Insight),
            other => Err(format!("unknown job kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Success,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Success => "success",
            JobStatus::Failed => "failed",
        }
    }

    /// Terminal statuses never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failed)
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "success" => Ok(JobStatus::Success),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

/// A submitted job request, validated before any record exists.
#[derive(Debug, Clone, PartialEq)]
pub enum JobRequest {
    Refresh {
        site: SiteCode,
    },
    Insight {
        site: SiteCode,
        asin: String,
        range_days: u32,
    },
}

impl JobRequest {
    pub fn kind(&self) -> JobKind {
        match self {
            JobRequest::Refresh { .. } => JobKind::Refresh,
            JobRequest::Insight { .. } => JobKind::Insight,
        }
    }

    pub fn site(&self) -> SiteCode {
        match self {
            JobRequest::Refresh { site } => *site,
            JobRequest::Insight { site, .. } => *site,
        }
    }
}

/// One tracked job, shared by both execution backends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub kind: JobKind,
    pub site: SiteCode,
    pub asin: Option<String>,
    pub range_days: Option<u32>,
    pub status: JobStatus,
    /// User id that submitted the job; reads are restricted to this user
    /// and admins.
    pub operator: String,
    /// Broker-side id once the job has been dispatched.
    pub queue_ref: Option<String>,
    pub error_message: Option<String>,
    pub result: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Build a fresh pending job for a validated request.
    pub fn new(request: &JobRequest, operator: &str) -> Self {
        let now = Utc::now();
        let (asin, range_days) = match request {
            JobRequest::Refresh { .. } => (None, None),
            JobRequest::Insight {
                asin, range_days, ..
            } => (Some(asin.clone()), Some(*range_days)),
        };
        Self {
            job_id: Uuid::new_v4().to_string(),
            kind: request.kind(),
            site: request.site(),
            asin,
            range_days,
            status: JobStatus::Pending,
            operator: operator.to_string(),
            queue_ref: None,
            error_message: None,
            result: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            finished_at: None,
        }
    }
}

/// Filter for listing insight jobs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InsightListFilter {
    pub site: Option<SiteCode>,
    pub asin: Option<String>,
    pub status: Option<JobStatus>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl InsightListFilter {
    pub const DEFAULT_LIMIT: usize = 50;

    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(Self::DEFAULT_LIMIT)
    }

    pub fn offset(&self) -> usize {
        self.offset.unwrap_or(0)
    }

    fn matches(&self, job: &Job) -> bool {
        if job.kind != JobKind::Insight {
            return false;
        }
        if let Some(site) = self.site {
            if job.site != site {
                return false;
            }
        }
        if let Some(ref asin) = self.asin {
            if job.asin.as_deref() != Some(asin.as_str()) {
                return false;
            }
        }
        if let Some(status) = self.status {
            if job.status != status {
                return false;
            }
        }
        true
    }

    /// Apply the filter to an in-memory job set, newest first.
    pub fn apply(&self, jobs: impl IntoIterator<Item = Job>) -> Vec<Job> {
        let mut out: Vec<Job> = jobs.into_iter().filter(|j| self.matches(j)).collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out.into_iter().skip(self.offset()).take(self.limit()).collect()
    }
}
