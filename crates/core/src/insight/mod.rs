//! Telemetry insight reports.

mod generator;
mod summary;

pub use generator::{
    HttpReportGenerator, InsightError, ReportContext, ReportGenerator,
};
pub use summary::{summarize, WindowSummary};

/// Report previews in listings are capped at this many chars.
pub const PREVIEW_CAP: usize = 280;

/// First [`PREVIEW_CAP`] chars of a report, for listings.
pub fn preview(report: &str) -> String {
    let trimmed = report.trim();
    if trimmed.chars().count() <= PREVIEW_CAP {
        return trimmed.to_string();
    }
    trimmed.chars().take(PREVIEW_CAP).collect()
}
