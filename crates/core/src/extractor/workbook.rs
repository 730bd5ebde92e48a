//! Workbook reading and row extraction.

use std::path::Path;

use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use tracing::debug;

use crate::telemetry::{SiteCode, TelemetryRow};

use super::coerce::{parse_date, parse_decimal, parse_int};
use super::error::ExtractError;
use super::headers::ColumnIndex;

/// First sheet of one agent workbook.
#[derive(Debug, Clone)]
pub struct Sheet {
    /// Sheet name; the agent embeds the product identifier here.
    pub name: String,
    pub range: Range<Data>,
}

/// Seam over workbook file access so extraction logic is testable with
/// in-memory ranges.
pub trait WorkbookReader: Send + Sync {
    /// Open the workbook at `path` and return its first sheet.
    fn read_first_sheet(&self, path: &Path) -> Result<Sheet, ExtractError>;
}

/// Reads xlsx workbooks from disk via calamine.
pub struct XlsxReader;

impl XlsxReader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for XlsxReader {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkbookReader for XlsxReader {
    fn read_first_sheet(&self, path: &Path) -> Result<Sheet, ExtractError> {
        let file = path.display().to_string();
        let mut workbook: Xlsx<_> = open_workbook(path).map_err(|e: calamine::XlsxError| ExtractError::Open {
            file: file.clone(),
            reason: e.to_string(),
        })?;

        let name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or(ExtractError::NoSheets { file: file.clone() })?;

        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| ExtractError::Open {
                file,
                reason: e.to_string(),
            })?;

        Ok(Sheet { name, range })
    }
}

const EMPTY_CELL: Data = Data::Empty;

fn cell<'a>(row: &'a [Data], idx: usize) -> &'a Data {
    row.get(idx).unwrap_or(&EMPTY_CELL)
}

fn opt_cell<'a>(row: &'a [Data], idx: Option<usize>) -> &'a Data {
    match idx {
        Some(idx) => cell(row, idx),
        None => &EMPTY_CELL,
    }
}

/// Extract telemetry rows from one sheet.
///
/// The sheet's embedded identifier is preferred over the filename-derived
/// one; with neither the sheet is skipped. Rows whose date cannot be
/// parsed are dropped (the date is the merge key); every other cell
/// coerces with a default and never fails.
pub fn extract_rows(
    sheet: &Sheet,
    fallback_asin: &str,
    site: SiteCode,
    file: &str,
) -> Result<Vec<TelemetryRow>, ExtractError> {
    let asin = {
        let embedded = sheet.name.trim().to_ascii_uppercase();
        if !embedded.is_empty() {
            embedded
        } else {
            fallback_asin.trim().to_ascii_uppercase()
        }
    };
    if asin.is_empty() {
        debug!(file, "no identifier on sheet or filename, skipping workbook");
        return Ok(Vec::new());
    }

    let mut rows_iter = sheet.range.rows();
    let header_row = rows_iter
        .next()
        .ok_or_else(|| ExtractError::NoHeaderRow {
            file: file.to_string(),
        })?;
    let cols = ColumnIndex::resolve(header_row, file)?;

    let mut rows = Vec::new();
    for row in rows_iter {
        let Some(date) = parse_date(cell(row, cols.date)) else {
            continue;
        };

        rows.push(TelemetryRow {
            site,
            asin: asin.clone(),
            date,
            buybox_price: parse_decimal(cell(row, cols.buybox_price), Some(0.0)).unwrap_or(0.0),
            price: parse_decimal(cell(row, cols.price), Some(0.0)).unwrap_or(0.0),
            prime_price: parse_decimal(cell(row, cols.prime_price), None),
            coupon_price: parse_decimal(cell(row, cols.coupon_price), None),
            coupon_discount: parse_decimal(cell(row, cols.coupon_discount), None),
            child_sales: parse_int(cell(row, cols.child_sales), None),
            fba_price: parse_decimal(opt_cell(row, cols.fba_price), None),
            fbm_price: parse_decimal(opt_cell(row, cols.fbm_price), None),
            strikethrough_price: parse_decimal(opt_cell(row, cols.strikethrough_price), None),
            rank: parse_int(opt_cell(row, cols.rank), None),
            category_rank_variant: parse_int(opt_cell(row, cols.category_rank_variant), None),
            rating: parse_decimal(opt_cell(row, cols.rating), None),
            rating_count: parse_int(opt_cell(row, cols.rating_count), None),
            seller_count: parse_int(opt_cell(row, cols.seller_count), None),
        });
    }

    Ok(rows)
}

/// Open one workbook and extract its telemetry rows.
pub fn extract_file(
    reader: &dyn WorkbookReader,
    path: &Path,
    fallback_asin: &str,
    site: SiteCode,
) -> Result<Vec<TelemetryRow>, ExtractError> {
    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    let sheet = reader.read_first_sheet(path)?;
    extract_rows(&sheet, fallback_asin, site, &file)
}
