//! Daily telemetry workbook extraction.
//!
//! Workbooks produced by the collection agent carry one product each: the
//! first sheet holds a header row of localized column names followed by one
//! row per day. Extraction resolves columns by exact name (plus alias
//! tables for the optional ones), coerces cells leniently, and drops only
//! rows whose date cannot be parsed.

mod coerce;
mod error;
mod headers;
mod workbook;

pub use coerce::{parse_date, parse_decimal, parse_int};
pub use error::ExtractError;
pub use headers::{ColumnIndex, CATEGORY_RANK_PREFIX, REQUIRED_HEADERS};
pub use workbook::{extract_file, extract_rows, Sheet, WorkbookReader, XlsxReader};
