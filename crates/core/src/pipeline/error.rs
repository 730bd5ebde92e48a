//! Pipeline error types.

use thiserror::Error;

use crate::extractor::ExtractError;
use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The roster has fewer collectable products than the run requires.
    #[error("site {site} has {have} tracked products with URLs, need {need}")]
    Undersupply {
        site: String,
        have: usize,
        need: usize,
    },

    #[error("collection agent could not be started: {reason}")]
    AgentSpawn { reason: String },

    #[error("collection agent failed: {detail}")]
    AgentFailed { detail: String },

    #[error("collection agent timed out after {secs}s")]
    AgentTimeout { secs: u64 },

    #[error("batch {index}/{total} failed: {detail}")]
    BatchFailed {
        index: usize,
        total: usize,
        detail: String,
    },

    #[error("batch {index}/{total} timed out after {secs}s")]
    BatchTimeout {
        index: usize,
        total: usize,
        secs: u64,
    },

    /// The agent exited cleanly but left nothing to import.
    #[error("no workbooks produced under {dir}")]
    NoOutput { dir: String },

    /// Workbooks were found but none yielded rows.
    #[error("no rows imported from {file_count} workbooks: {detail}")]
    NoRows { file_count: usize, detail: String },

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Store(#[from] TelemetryError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
