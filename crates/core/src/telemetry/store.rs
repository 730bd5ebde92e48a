//! Telemetry storage trait.

use chrono::NaiveDate;
use thiserror::Error;

use super::types::{SiteCode, TelemetryRow, TrackedTarget};

/// Error type for telemetry store operations.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Database error: {0}")]
    Database(String),
}

/// Storage for the tracked-product roster and the daily telemetry series.
///
/// `upsert_daily_rows` is the single entry point through which telemetry
/// rows are created or overwritten.
pub trait TelemetryStore: Send + Sync {
    /// Targets from the most recent roster snapshot for a site, best rank
    /// first, products without a URL excluded.
    fn latest_targets(
        &self,
        site: SiteCode,
        limit: usize,
    ) -> Result<Vec<TrackedTarget>, TelemetryError>;

    /// Record a roster snapshot for a site.
    fn insert_snapshot(
        &self,
        site: SiteCode,
        snapshot_date: NaiveDate,
        targets: &[(String, String, i64)],
    ) -> Result<(), TelemetryError>;

    /// Idempotent multi-row merge keyed on (site, asin, date); every
    /// telemetry column is overwritten by the new values. Returns the
    /// number of rows written.
    fn upsert_daily_rows(&self, rows: &[TelemetryRow]) -> Result<usize, TelemetryError>;

    /// Rows for (asin, site) within `range_days` back from the latest
    /// stored date, ascending. Empty when no data exists.
    fn fetch_daily_window(
        &self,
        asin: &str,
        site: SiteCode,
        range_days: u32,
    ) -> Result<Vec<TelemetryRow>, TelemetryError>;

    /// Total stored daily rows (diagnostics and tests).
    fn daily_row_count(&self) -> Result<i64, TelemetryError>;
}
