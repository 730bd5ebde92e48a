//! Job subsystem errors.

use thiserror::Error;

use crate::insight::InsightError;
use crate::pipeline::PipelineError;
use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub enum JobError {
    /// The request is malformed; no job record was created.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The roster cannot supply a full refresh run; no job record was
    /// created.
    #[error("site {site} has {have} tracked products with URLs, need {need}")]
    Undersupply {
        site: String,
        have: usize,
        need: usize,
    },

    /// The requester is neither the submitting operator nor an admin.
    #[error("access denied")]
    AccessDenied,

    #[error("job {0} not found")]
    NotFound(String),

    /// The broker refused the dispatch.
    #[error("queue dispatch failed: {0}")]
    Queue(String),

    #[error("job store error: {0}")]
    Store(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Insight(#[from] InsightError),
}

impl From<TelemetryError> for JobError {
    fn from(e: TelemetryError) -> Self {
        JobError::Store(e.to_string())
    }
}

impl From<rusqlite::Error> for JobError {
    fn from(e: rusqlite::Error) -> Self {
        JobError::Store(e.to_string())
    }
}
