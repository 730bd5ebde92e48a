//! Error types for workbook extraction.

use thiserror::Error;

/// Errors that can occur while extracting telemetry rows from one
/// workbook. These are per-file failures; the refresh pipeline records
/// them and keeps going.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Workbook could not be opened or read.
    #[error("Failed to open workbook {file}: {reason}")]
    Open { file: String, reason: String },

    /// Workbook has no sheets.
    #[error("Workbook {file} has no sheets")]
    NoSheets { file: String },

    /// First sheet has no header row.
    #[error("Workbook {file} has no header row")]
    NoHeaderRow { file: String },

    /// One or more required columns are absent from the header row.
    #[error("{file} is missing columns: {columns}")]
    MissingColumns { file: String, columns: String },
}

impl ExtractError {
    pub fn missing_columns(file: impl Into<String>, columns: &[&str]) -> Self {
        Self::MissingColumns {
            file: file.into(),
            columns: columns.join(", "),
        }
    }
}
