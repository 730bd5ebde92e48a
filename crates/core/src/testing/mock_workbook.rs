//! Mock workbook reader for testing.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use crate::extractor::{ExtractError, Sheet, WorkbookReader};

/// Mock implementation of [`WorkbookReader`].
///
/// Sheets are registered by file name; reading an unregistered or
/// failure-registered file returns an open error, like a corrupt
/// workbook would.
pub struct MockWorkbookReader {
    sheets: Mutex<HashMap<String, Result<Sheet, String>>>,
}

impl Default for MockWorkbookReader {
    fn default() -> Self {
        Self::new()
    }
}

impl MockWorkbookReader {
    pub fn new() -> Self {
        Self {
            sheets: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert_sheet(&self, file_name: &str, sheet: Sheet) {
        self.sheets
            .lock()
            .unwrap()
            .insert(file_name.to_string(), Ok(sheet));
    }

    pub fn insert_failure(&self, file_name: &str, reason: &str) {
        self.sheets
            .lock()
            .unwrap()
            .insert(file_name.to_string(), Err(reason.to_string()));
    }
}

impl WorkbookReader for MockWorkbookReader {
    fn read_first_sheet(&self, path: &Path) -> Result<Sheet, ExtractError> {
        let file = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        match self.sheets.lock().unwrap().get(&file) {
            Some(Ok(sheet)) => Ok(sheet.clone()),
            Some(Err(reason)) => Err(ExtractError::Open {
                file,
                reason: reason.clone(),
            }),
            None => Err(ExtractError::Open {
                file,
                reason: "no sheet registered".to_string(),
            }),
        }
    }
}
