//! Matching agent output files back to the products they were collected for.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use regex_lite::Regex;
use tracing::debug;

/// A workbook accepted for import, with the product identifier its
/// filename carries.
#[derive(Debug, Clone)]
pub struct WorkbookFile {
    pub path: PathBuf,
    pub asin: String,
}

/// Extract a product identifier from a product URL.
///
/// Canonical `/dp/` and `/gp/product/` paths are tried first; a bare
/// ten-character token anywhere in the URL is the last resort. Matches
/// are case-insensitive and the result is uppercased.
pub fn asin_from_url(url: &str) -> Option<String> {
    let patterns = [
        r"(?i)/dp/([A-Z0-9]{10})",
        r"(?i)/gp/product/([A-Z0-9]{10})",
        r"(?i)\b([A-Z0-9]{10})\b",
    ];
    for pattern in patterns {
        let re = Regex::new(pattern).ok()?;
        if let Some(caps) = re.captures(url) {
            if let Some(m) = caps.get(1) {
                return Some(m.as_str().to_ascii_uppercase());
            }
        }
    }
    None
}

/// Extract the product identifier an agent filename starts with
/// (`<asin>_daily.xlsx` or `<asin>.xlsx`).
pub fn asin_from_filename(name: &str) -> Option<String> {
    let stem = name.strip_suffix(".xlsx").unwrap_or(name);
    let re = Regex::new(r"^([A-Za-z0-9]{10})(?:_|$)").ok()?;
    re.captures(stem)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_ascii_uppercase())
}

/// Scan `dir` for workbooks written by this run.
///
/// A file qualifies when it has the xlsx extension, is not an Office lock
/// file (`~$` prefix), was modified at or after `started_at`, and its
/// filename names a product in `expected`. Anything else in the directory
/// is left alone.
pub fn collect_workbooks(
    dir: &Path,
    expected: &HashSet<String>,
    started_at: SystemTime,
) -> std::io::Result<Vec<WorkbookFile>> {
    let mut found = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with("~$") {
            continue;
        }
        if !name.to_ascii_lowercase().ends_with(".xlsx") {
            continue;
        }

        let modified = entry.metadata()?.modified()?;
        if modified < started_at {
            debug!(file = name, "stale workbook predates this run, skipping");
            continue;
        }

        let Some(asin) = asin_from_filename(name) else {
            debug!(file = name, "workbook filename carries no identifier, skipping");
            continue;
        };
        if !expected.contains(&asin) {
            debug!(file = name, %asin, "workbook not in this run's roster, skipping");
            continue;
        }

        found.push(WorkbookFile { path, asin });
    }

    found.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(found)
}
