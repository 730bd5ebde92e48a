//! Job persistence trait.

use super::error::JobError;
use super::types::{InsightListFilter, Job};

/// Storage for job records, shared by both execution backends.
///
/// Status transitions are monotone: once a job is terminal the `mark_*`
/// methods leave it untouched. `mark_failed` caps the stored message at
/// [`ERROR_MESSAGE_CAP`](super::ERROR_MESSAGE_CAP) chars.
pub trait JobStore: Send + Sync {
    fn insert(&self, job: &Job) -> Result<(), JobError>;

    fn get(&self, job_id: &str) -> Result<Option<Job>, JobError>;

    /// Attach the broker-side id after a successful dispatch.
    fn set_queue_ref(&self, job_id: &str, queue_ref: &str) -> Result<(), JobError>;

    fn mark_running(&self, job_id: &str) -> Result<(), JobError>;

    fn mark_success(&self, job_id: &str, result: &serde_json::Value) -> Result<(), JobError>;

    fn mark_failed(&self, job_id: &str, error_message: &str) -> Result<(), JobError>;

    /// Insight jobs matching `filter`, newest first. `operator` scopes the
    /// listing to one submitter; `None` lists across all operators.
    fn list_insight(
        &self,
        filter: &InsightListFilter,
        operator: Option<&str>,
    ) -> Result<Vec<Job>, JobError>;
}

/// Cap a failure message for storage, respecting char boundaries.
pub(crate) fn truncate_message(message: &str, cap: usize) -> String {
    if message.len() <= cap {
        return message.to_string();
    }
    let mut cut = cap;
    while !message.is_char_boundary(cut) {
        cut -= 1;
    }
    message[..cut].to_string()
}
