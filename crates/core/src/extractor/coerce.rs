//! Cell-level coercion helpers.
//!
//! Row decoding never raises: every helper returns the caller-supplied
//! default (or `None`) when a cell cannot be coerced. The date parser is
//! the one exception in spirit - it returns `None` and the caller drops
//! the row, since the date is the merge key.

use calamine::{Data, DataType};
use chrono::NaiveDate;

/// Date formats the collection agent has been observed to emit.
const DATE_FORMATS: [&str; 4] = ["%Y/%m/%d", "%Y-%m-%d", "%m/%d/%Y", "%Y.%m.%d"];

/// Parse a cell into a date. Native spreadsheet datetimes are used
/// directly; strings are tried against each known format.
pub fn parse_date(cell: &Data) -> Option<NaiveDate> {
    if let Some(dt) = cell.as_datetime() {
        return Some(dt.date());
    }
    if let Some(date) = cell.as_date() {
        return Some(date);
    }

    let raw = cell.as_string()?;
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(date);
        }
    }
    None
}

/// Parse a cell into a float, stripping thousands separators and
/// currency/percent symbols first.
pub fn parse_decimal(cell: &Data, default: Option<f64>) -> Option<f64> {
    if cell.is_empty() {
        return default;
    }
    if let Some(value) = cell.as_f64() {
        return Some(value);
    }

    let raw = match cell.as_string() {
        Some(s) => s,
        None => return default,
    };
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '$' | '%'))
        .collect();
    if cleaned.is_empty() {
        return default;
    }
    cleaned.parse::<f64>().ok().or(default)
}

/// Parse a cell into an integer, accepting "1,234" and "500+" style
/// strings and truncating fractional values.
pub fn parse_int(cell: &Data, default: Option<i64>) -> Option<i64> {
    if cell.is_empty() {
        return default;
    }
    if let Data::Bool(b) = cell {
        return Some(*b as i64);
    }
    if let Some(value) = cell.as_f64() {
        return Some(value as i64);
    }

    let raw = match cell.as_string() {
        Some(s) => s,
        None => return default,
    };
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '+'))
        .collect();
    if cleaned.is_empty() {
        return default;
    }
    cleaned.parse::<f64>().map(|v| v as i64).ok().or(default)
}
