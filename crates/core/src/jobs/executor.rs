//! Job body execution, shared by both backends.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::insight::{preview, summarize, ReportContext, ReportGenerator};
use crate::pipeline::RefreshPipeline;
use crate::telemetry::TelemetryStore;

use super::error::JobError;
use super::store::JobStore;
use super::types::{Job, JobKind};

/// Runs job bodies against the pipeline and the telemetry store.
pub struct JobExecutor {
    pipeline: Arc<RefreshPipeline>,
    telemetry: Arc<dyn TelemetryStore>,
    reporter: Option<Arc<dyn ReportGenerator>>,
}

impl JobExecutor {
    pub fn new(
        pipeline: Arc<RefreshPipeline>,
        telemetry: Arc<dyn TelemetryStore>,
        reporter: Option<Arc<dyn ReportGenerator>>,
    ) -> Self {
        Self {
            pipeline,
            telemetry,
            reporter,
        }
    }

    pub fn insight_enabled(&self) -> bool {
        self.reporter.is_some()
    }

    /// Execute one job body to a result payload.
    pub async fn execute(&self, job: &Job) -> Result<serde_json::Value, JobError> {
        match job.kind {
            JobKind::Refresh => {
                let report = self.pipeline.run(job.site, &job.job_id).await?;
                serde_json::to_value(&report).map_err(|e| JobError::Store(e.to_string()))
            }
            JobKind::Insight => self.execute_insight(job).await,
        }
    }

    async fn execute_insight(&self, job: &Job) -> Result<serde_json::Value, JobError> {
        let reporter = self
            .reporter
            .as_ref()
            .ok_or(crate::insight::InsightError::NotConfigured)?;
        let asin = job
            .asin
            .as_deref()
            .ok_or_else(|| JobError::Validation("insight job without asin".to_string()))?;
        let range_days = job
            .range_days
            .ok_or_else(|| JobError::Validation("insight job without range_days".to_string()))?;

        let rows = self
            .telemetry
            .fetch_daily_window(asin, job.site, range_days)?;
        let Some(summary) = summarize(&rows) else {
            return Err(JobError::Validation(format!(
                "no telemetry data for {asin} on {}",
                job.site
            )));
        };

        let context = ReportContext {
            site: job.site.as_str().to_string(),
            asin: asin.to_string(),
            range_days,
            summary,
            rows,
        };
        let report = reporter.generate(&context).await?;

        Ok(serde_json::json!({
            "asin": context.asin,
            "site": context.site,
            "range_days": range_days,
            "window": { "from": context.summary.from, "to": context.summary.to },
            "row_count": context.summary.days,
            "summary": context.summary,
            "preview": preview(&report),
            "report": report,
        }))
    }
}

/// Drive one job through its lifecycle: mark it running, execute the body
/// on a separate task so a panic becomes a failure, and record the
/// terminal state. Jobs already terminal (a redelivered dispatch) are left
/// alone.
pub async fn run_job(store: Arc<dyn JobStore>, executor: Arc<JobExecutor>, job_id: String) {
    let job = match store.get(&job_id) {
        Ok(Some(job)) => job,
        Ok(None) => {
            warn!(job_id, "dispatched job not found, dropping");
            return;
        }
        Err(e) => {
            error!(job_id, error = %e, "failed to load dispatched job");
            return;
        }
    };
    if job.status.is_terminal() {
        info!(job_id, status = job.status.as_str(), "job already terminal, skipping");
        return;
    }

    if let Err(e) = store.mark_running(&job_id) {
        error!(job_id, error = %e, "failed to mark job running");
        return;
    }

    let body = {
        let executor = executor.clone();
        let job = job.clone();
        tokio::spawn(async move { executor.execute(&job).await })
    };

    let outcome = match body.await {
        Ok(Ok(result)) => store.mark_success(&job_id, &result),
        Ok(Err(e)) => {
            warn!(job_id, error = %e, "job failed");
            store.mark_failed(&job_id, &e.to_string())
        }
        Err(join_err) => {
            error!(job_id, error = %join_err, "job body panicked");
            store.mark_failed(&job_id, &format!("job execution panicked: {join_err}"))
        }
    };
    if let Err(e) = outcome {
        error!(job_id, error = %e, "failed to record job outcome");
    }
}
