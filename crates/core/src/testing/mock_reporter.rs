//! Mock report generator for testing insight jobs.

use async_trait::async_trait;
use std::sync::Mutex;
use tokio::sync::RwLock;

use crate::insight::{InsightError, ReportContext, ReportGenerator};

/// Recorded request for one generated report.
#[derive(Debug, Clone)]
pub struct RecordedReport {
    pub site: String,
    pub asin: String,
    pub range_days: u32,
    pub row_count: usize,
}

/// Mock implementation of [`ReportGenerator`] with a canned response.
pub struct MockReportGenerator {
    response: Mutex<Result<String, String>>,
    requests: RwLock<Vec<RecordedReport>>,
}

impl Default for MockReportGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl MockReportGenerator {
    pub fn new() -> Self {
        Self {
            response: Mutex::new(Ok("Price held steady over the window.".to_string())),
            requests: RwLock::new(Vec::new()),
        }
    }

    pub fn set_response(&self, report: &str) {
        *self.response.lock().unwrap() = Ok(report.to_string());
    }

    pub fn set_failure(&self, message: &str) {
        *self.response.lock().unwrap() = Err(message.to_string());
    }

    pub async fn requests(&self) -> Vec<RecordedReport> {
        self.requests.read().await.clone()
    }
}

#[async_trait]
impl ReportGenerator for MockReportGenerator {
    async fn generate(&self, context: &ReportContext) -> Result<String, InsightError> {
        self.requests.write().await.push(RecordedReport {
            site: context.site.clone(),
            asin: context.asin.clone(),
            range_days: context.range_days,
            row_count: context.rows.len(),
        });
        match &*self.response.lock().unwrap() {
            Ok(report) => Ok(report.clone()),
            Err(message) => Err(InsightError::Http(message.clone())),
        }
    }
}
