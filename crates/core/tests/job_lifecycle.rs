//! End-to-end job lifecycle tests over both execution backends.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;

use rankwatch_core::auth::Identity;
use rankwatch_core::config::PipelineConfig;
use rankwatch_core::jobs::{
    DurableBackend, FallbackBackend, InsightListFilter, JobBackend, JobBroker, JobError,
    JobExecutor, JobStatus, JobStore, MemoryJobStore, SqliteJobStore,
};
use rankwatch_core::pipeline::RefreshPipeline;
use rankwatch_core::telemetry::{SiteCode, SqliteTelemetryStore, TelemetryStore};
use rankwatch_core::testing::{
    seeded_sheet, MockAgent, MockBatch, MockBroker, MockReportGenerator, MockWorkbookReader,
};
use rankwatch_core::{JobRequest, ReportGenerator};

struct Harness {
    telemetry: Arc<SqliteTelemetryStore>,
    agent: Arc<MockAgent>,
    reader: Arc<MockWorkbookReader>,
    reporter: Arc<MockReportGenerator>,
    pipeline: Arc<RefreshPipeline>,
    executor: Arc<JobExecutor>,
    _output_dir: tempfile::TempDir,
}

impl Harness {
    fn new() -> Self {
        let output_dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            agent_command: vec!["collector".to_string()],
            output_root: output_dir.path().to_path_buf(),
            roster_size: 4,
            batch_size: 2,
            batch_timeout_secs: 30,
        };

        let telemetry = Arc::new(SqliteTelemetryStore::in_memory().unwrap());
        let agent = Arc::new(MockAgent::new());
        let reader = Arc::new(MockWorkbookReader::new());
        let reporter = Arc::new(MockReportGenerator::new());
        let pipeline = Arc::new(RefreshPipeline::new(
            config,
            telemetry.clone(),
            agent.clone(),
            reader.clone(),
        ));
        let executor = Arc::new(JobExecutor::new(
            pipeline.clone(),
            telemetry.clone(),
            Some(reporter.clone() as Arc<dyn ReportGenerator>),
        ));

        Self {
            telemetry,
            agent,
            reader,
            reporter,
            pipeline,
            executor,
            _output_dir: output_dir,
        }
    }

    fn seed_roster(&self, count: usize) {
        let snapshot: Vec<(String, String, i64)> = (0..count)
            .map(|i| {
                let asin = format!("B0AAAAAA{i:02}");
                (
                    asin.clone(),
                    format!("https://www.amazon.com/dp/{asin}"),
                    (i + 1) as i64,
                )
            })
            .collect();
        self.telemetry
            .insert_snapshot(
                SiteCode::Us,
                NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
                &snapshot,
            )
            .unwrap();
    }

    /// Script a clean two-batch agent run with one workbook per product.
    fn script_successful_run(&self) {
        for pair in [[0usize, 1], [2, 3]] {
            let files: Vec<String> = pair
                .iter()
                .map(|i| format!("B0AAAAAA{i:02}_daily.xlsx"))
                .collect();
            self.agent.push_batch(MockBatch::Succeed { files });
        }
        for i in 0..4 {
            let asin = format!("B0AAAAAA{i:02}");
            self.reader.insert_sheet(
                &format!("{asin}_daily.xlsx"),
                seeded_sheet(&asin, "2025-06-01", 19.99),
            );
        }
    }

    fn fallback_backend(&self) -> (Arc<dyn JobStore>, FallbackBackend) {
        let store: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new(200));
        let backend = FallbackBackend::new(
            store.clone(),
            self.executor.clone(),
            self.pipeline.clone(),
        );
        (store, backend)
    }

    fn durable_backend(&self) -> (Arc<dyn JobStore>, Arc<MockBroker>, DurableBackend) {
        let store: Arc<dyn JobStore> = Arc::new(SqliteJobStore::in_memory().unwrap());
        let broker = Arc::new(MockBroker::new());
        let backend = DurableBackend::new(
            store.clone(),
            broker.clone(),
            self.pipeline.clone(),
            true,
        );
        (store, broker, backend)
    }
}

async fn wait_for_terminal(store: &dyn JobStore, job_id: &str) -> rankwatch_core::Job {
    for _ in 0..300 {
        let job = store.get(job_id).unwrap().unwrap();
        if job.status.is_terminal() {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} never reached a terminal state");
}

#[tokio::test]
async fn test_fallback_refresh_success() {
    let harness = Harness::new();
    harness.seed_roster(4);
    harness.script_successful_run();
    let (store, backend) = harness.fallback_backend();

    let job = backend
        .submit(JobRequest::Refresh { site: SiteCode::Us }, &Identity::operator("alice"))
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::Pending);

    let done = wait_for_terminal(store.as_ref(), &job.job_id).await;
    assert_eq!(done.status, JobStatus::Success);
    let result = done.result.unwrap();
    assert_eq!(result["imported_rows"], 4);
    assert_eq!(result["batch_count"], 2);
    assert_eq!(result["site"], "US");
    assert_eq!(harness.telemetry.daily_row_count().unwrap(), 4);
}

#[tokio::test]
async fn test_undersupply_rejected_without_a_record() {
    let harness = Harness::new();
    harness.seed_roster(2); // below the required roster size
    let (store, backend) = harness.fallback_backend();

    let err = backend
        .submit(JobRequest::Refresh { site: SiteCode::Us }, &Identity::operator("alice"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        JobError::Undersupply {
            have: 2,
            need: 4,
            ..
        }
    ));
    assert!(err.to_string().contains("need 4"));

    // No job record exists and the agent never ran.
    assert!(store
        .list_insight(&InsightListFilter::default(), None)
        .unwrap()
        .is_empty());
    assert!(harness.agent.calls().await.is_empty());
}

#[tokio::test]
async fn test_fallback_batch_timeout_fails_job() {
    let harness = Harness::new();
    harness.seed_roster(4);
    harness.agent.push_batch(MockBatch::Succeed { files: vec![] });
    harness.agent.push_batch(MockBatch::Timeout { secs: 30 });
    let (store, backend) = harness.fallback_backend();

    let job = backend
        .submit(JobRequest::Refresh { site: SiteCode::Us }, &Identity::operator("alice"))
        .await
        .unwrap();
    let done = wait_for_terminal(store.as_ref(), &job.job_id).await;
    assert_eq!(done.status, JobStatus::Failed);
    let message = done.error_message.unwrap();
    assert!(message.contains("batch 2/2"));
    assert!(message.contains("timed out after 30s"));
}

#[tokio::test]
async fn test_partial_workbook_failure_still_succeeds() {
    let harness = Harness::new();
    harness.seed_roster(4);
    for pair in [[0usize, 1], [2, 3]] {
        let files: Vec<String> = pair
            .iter()
            .map(|i| format!("B0AAAAAA{i:02}_daily.xlsx"))
            .collect();
        harness.agent.push_batch(MockBatch::Succeed { files });
    }
    for i in 0..4 {
        let asin = format!("B0AAAAAA{i:02}");
        let file = format!("{asin}_daily.xlsx");
        if i == 3 {
            harness.reader.insert_failure(&file, "corrupt workbook");
        } else {
            harness
                .reader
                .insert_sheet(&file, seeded_sheet(&asin, "2025-06-01", 9.5));
        }
    }
    let (store, backend) = harness.fallback_backend();

    let job = backend
        .submit(JobRequest::Refresh { site: SiteCode::Us }, &Identity::operator("alice"))
        .await
        .unwrap();
    let done = wait_for_terminal(store.as_ref(), &job.job_id).await;
    assert_eq!(done.status, JobStatus::Success);
    let result = done.result.unwrap();
    assert_eq!(result["imported_rows"], 3);
    assert_eq!(result["failed_files"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_refresh_rerun_is_idempotent() {
    let harness = Harness::new();
    harness.seed_roster(4);
    let (store, backend) = harness.fallback_backend();

    harness.script_successful_run();
    let first = backend
        .submit(JobRequest::Refresh { site: SiteCode::Us }, &Identity::operator("alice"))
        .await
        .unwrap();
    wait_for_terminal(store.as_ref(), &first.job_id).await;

    harness.script_successful_run();
    let second = backend
        .submit(JobRequest::Refresh { site: SiteCode::Us }, &Identity::operator("alice"))
        .await
        .unwrap();
    let done = wait_for_terminal(store.as_ref(), &second.job_id).await;

    assert_eq!(done.status, JobStatus::Success);
    // Same (site, asin, date) keys merged, not duplicated.
    assert_eq!(harness.telemetry.daily_row_count().unwrap(), 4);
}

#[tokio::test]
async fn test_job_reads_are_owner_or_admin_only() {
    let harness = Harness::new();
    harness.seed_roster(4);
    harness.script_successful_run();
    let (store, backend) = harness.fallback_backend();

    let job = backend
        .submit(JobRequest::Refresh { site: SiteCode::Us }, &Identity::operator("alice"))
        .await
        .unwrap();
    wait_for_terminal(store.as_ref(), &job.job_id).await;

    assert!(backend
        .get(&job.job_id, &Identity::operator("alice"))
        .await
        .is_ok());
    assert!(matches!(
        backend.get(&job.job_id, &Identity::operator("bob")).await,
        Err(JobError::AccessDenied)
    ));
    assert!(backend
        .get(&job.job_id, &Identity::admin("root"))
        .await
        .is_ok());
    assert!(matches!(
        backend.get("missing", &Identity::admin("root")).await,
        Err(JobError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_insight_job_produces_report() {
    let harness = Harness::new();
    harness.reporter.set_response("Rank improved steadily.");
    let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
    let mut rows = Vec::new();
    for offset in 0..5 {
        let mut row = rankwatch_core::TelemetryRow::empty(
            SiteCode::Us,
            "B0ABCDEF12",
            date + chrono::Duration::days(offset),
        );
        row.price = 20.0 + offset as f64;
        row.buybox_price = 19.0;
        row.rank = Some(1000 - offset * 10);
        rows.push(row);
    }
    harness.telemetry.upsert_daily_rows(&rows).unwrap();

    let (store, backend) = harness.fallback_backend();
    let job = backend
        .submit(
            JobRequest::Insight {
                site: SiteCode::Us,
                asin: "b0abcdef12".to_string(), // normalized on submit
                range_days: 7,
            },
            &Identity::operator("alice"),
        )
        .await
        .unwrap();
    assert_eq!(job.asin.as_deref(), Some("B0ABCDEF12"));

    let done = wait_for_terminal(store.as_ref(), &job.job_id).await;
    assert_eq!(done.status, JobStatus::Success);
    let result = done.result.unwrap();
    assert_eq!(result["report"], "Rank improved steadily.");
    assert_eq!(result["row_count"], 5);
    assert_eq!(result["preview"], "Rank improved steadily.");

    let requests = harness.reporter.requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].asin, "B0ABCDEF12");
    assert_eq!(requests[0].row_count, 5);
}

#[tokio::test]
async fn test_insight_with_no_data_fails() {
    let harness = Harness::new();
    let (store, backend) = harness.fallback_backend();

    let job = backend
        .submit(
            JobRequest::Insight {
                site: SiteCode::Us,
                asin: "B0ABCDEF12".to_string(),
                range_days: 30,
            },
            &Identity::operator("alice"),
        )
        .await
        .unwrap();
    let done = wait_for_terminal(store.as_ref(), &job.job_id).await;
    assert_eq!(done.status, JobStatus::Failed);
    assert!(done.error_message.unwrap().contains("no telemetry data"));
}

#[tokio::test]
async fn test_insight_validation_rejects_bad_requests() {
    let harness = Harness::new();
    let (_store, backend) = harness.fallback_backend();
    let alice = Identity::operator("alice");

    let err = backend
        .submit(
            JobRequest::Insight {
                site: SiteCode::Us,
                asin: "B0ABCDEF12".to_string(),
                range_days: 14,
            },
            &alice,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, JobError::Validation(_)));
    assert!(err.to_string().contains("range_days"));

    let err = backend
        .submit(
            JobRequest::Insight {
                site: SiteCode::Us,
                asin: "not-an-asin".to_string(),
                range_days: 7,
            },
            &alice,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, JobError::Validation(_)));
}

#[tokio::test]
async fn test_insight_listing_is_operator_scoped() {
    let harness = Harness::new();
    let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
    let row = rankwatch_core::TelemetryRow::empty(SiteCode::Us, "B0ABCDEF12", date);
    harness.telemetry.upsert_daily_rows(&[row]).unwrap();

    let (store, backend) = harness.fallback_backend();
    let request = JobRequest::Insight {
        site: SiteCode::Us,
        asin: "B0ABCDEF12".to_string(),
        range_days: 7,
    };
    let a = backend
        .submit(request.clone(), &Identity::operator("alice"))
        .await
        .unwrap();
    let b = backend
        .submit(request, &Identity::operator("bob"))
        .await
        .unwrap();
    wait_for_terminal(store.as_ref(), &a.job_id).await;
    wait_for_terminal(store.as_ref(), &b.job_id).await;

    let filter = InsightListFilter::default();
    let alices = backend
        .list_insight(&filter, &Identity::operator("alice"))
        .await
        .unwrap();
    assert_eq!(alices.len(), 1);
    assert_eq!(alices[0].operator, "alice");

    let admins = backend
        .list_insight(&filter, &Identity::admin("root"))
        .await
        .unwrap();
    assert_eq!(admins.len(), 2);
}

#[tokio::test]
async fn test_durable_submit_dispatches_and_worker_completes() {
    let harness = Harness::new();
    harness.seed_roster(4);
    harness.script_successful_run();
    let (store, broker, backend) = harness.durable_backend();

    let job = backend
        .submit(JobRequest::Refresh { site: SiteCode::Us }, &Identity::operator("alice"))
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    assert!(job.queue_ref.is_some());

    // Consume the dispatch like a worker would.
    let message = broker
        .pop(Duration::from_secs(1))
        .await
        .unwrap()
        .expect("dispatch should be queued");
    assert_eq!(message.job_id, job.job_id);
    rankwatch_core::jobs::run_job(store.clone(), harness.executor.clone(), message.job_id).await;

    let done = store.get(&job.job_id).unwrap().unwrap();
    assert_eq!(done.status, JobStatus::Success);
    assert_eq!(done.result.unwrap()["imported_rows"], 4);
}

#[tokio::test]
async fn test_durable_redelivery_is_harmless() {
    let harness = Harness::new();
    harness.seed_roster(4);
    harness.script_successful_run();
    let (store, broker, backend) = harness.durable_backend();

    let job = backend
        .submit(JobRequest::Refresh { site: SiteCode::Us }, &Identity::operator("alice"))
        .await
        .unwrap();
    let message = broker.pop(Duration::from_secs(1)).await.unwrap().unwrap();

    rankwatch_core::jobs::run_job(store.clone(), harness.executor.clone(), message.job_id.clone())
        .await;
    let first = store.get(&job.job_id).unwrap().unwrap();
    assert_eq!(first.status, JobStatus::Success);

    // Redelivered dispatch finds a terminal job and leaves it untouched.
    rankwatch_core::jobs::run_job(store.clone(), harness.executor.clone(), message.job_id).await;
    let second = store.get(&job.job_id).unwrap().unwrap();
    assert_eq!(second.finished_at, first.finished_at);
    assert_eq!(harness.agent.calls().await.len(), 2);
}

#[tokio::test]
async fn test_durable_dispatch_failure_marks_job_failed() {
    let harness = Harness::new();
    let (store, broker, backend) = harness.durable_backend();
    broker.set_fail_dispatch(true);

    let err = backend
        .submit(
            JobRequest::Insight {
                site: SiteCode::Us,
                asin: "B0ABCDEF12".to_string(),
                range_days: 7,
            },
            &Identity::operator("alice"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, JobError::Queue(_)));

    // The record exists, already failed, with the dispatch error recorded.
    let jobs = store
        .list_insight(&InsightListFilter::default(), None)
        .unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, JobStatus::Failed);
    assert!(jobs[0]
        .error_message
        .as_deref()
        .unwrap()
        .contains("dispatch failed"));
}
