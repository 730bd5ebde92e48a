//! Tracked-product roster and daily telemetry time series.

mod sqlite;
mod store;
mod types;

pub use sqlite::SqliteTelemetryStore;
pub use store::{TelemetryError, TelemetryStore};
pub use types::{SiteCode, TelemetryRow, TrackedTarget, UnsupportedSite};
