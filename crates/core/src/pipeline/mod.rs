//! Daily telemetry refresh pipeline.
//!
//! A refresh run resolves the tracked-product roster for a site, drives
//! the external collection agent over the product URLs in fixed-size
//! batches, reconciles the files the agent left behind, extracts their
//! telemetry rows, and merges them into storage.

mod agent;
mod error;
mod reconcile;
mod runner;

pub use agent::{BatchOutput, CollectionAgent, ProcessAgent, OUTPUT_TAIL_CAP};
pub use error::PipelineError;
pub use reconcile::{asin_from_filename, asin_from_url, collect_workbooks, WorkbookFile};
pub use runner::{RefreshPipeline, RefreshReport, Roster};
