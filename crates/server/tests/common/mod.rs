//! Common test utilities for API testing with mocks.
//!
//! Provides a test fixture that assembles an in-process server with mock
//! collection and reporting dependencies, so endpoints can be exercised
//! without spawning an agent or reaching Redis.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::NaiveDate;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use rankwatch_core::config::{
    AuthConfig, AuthMethod, Config, DatabaseConfig, JobsConfig, PipelineConfig, ServerConfig,
    TokenEntry,
};
use rankwatch_core::testing::{
    seeded_sheet, MockAgent, MockBatch, MockReportGenerator, MockWorkbookReader,
};
use rankwatch_core::{
    create_authenticator, FallbackBackend, JobBackend, JobExecutor, MemoryJobStore,
    RefreshPipeline, ReportGenerator, Role, SiteCode, SqliteTelemetryStore, TelemetryStore,
};

pub const ADMIN_KEY: &str = "alice-admin-key";
pub const OPERATOR_KEY: &str = "bob-operator-key";
pub const SECOND_OPERATOR_KEY: &str = "carol-operator-key";

/// Test fixture for API testing with mock dependencies.
///
/// The fixture wires a fallback job backend over an in-memory telemetry
/// store seeded with a four-product roster, so a refresh submission runs
/// end to end against the mocks.
pub struct TestFixture {
    pub router: Router,
    pub telemetry: Arc<SqliteTelemetryStore>,
    pub agent: Arc<MockAgent>,
    pub reader: Arc<MockWorkbookReader>,
    pub reporter: Arc<MockReportGenerator>,
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub text: String,
}

impl TestFixture {
    /// Create a fixture with api_key auth and three configured tokens.
    pub async fn new() -> Self {
        Self::with_auth(AuthMethod::ApiKey).await
    }

    /// Create a fixture with anonymous (method = "none") auth.
    pub async fn anonymous() -> Self {
        Self::with_auth(AuthMethod::None).await
    }

    async fn with_auth(method: AuthMethod) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let tokens = vec![
            TokenEntry {
                key: ADMIN_KEY.to_string(),
                user_id: "alice".to_string(),
                role: Role::Admin,
            },
            TokenEntry {
                key: OPERATOR_KEY.to_string(),
                user_id: "bob".to_string(),
                role: Role::Operator,
            },
            TokenEntry {
                key: SECOND_OPERATOR_KEY.to_string(),
                user_id: "carol".to_string(),
                role: Role::Operator,
            },
        ];

        let pipeline_config = PipelineConfig {
            agent_command: vec!["collector".to_string()],
            output_root: temp_dir.path().join("output"),
            roster_size: 4,
            batch_size: 2,
            batch_timeout_secs: 30,
        };

        let config = Config {
            auth: AuthConfig { method, tokens },
            server: ServerConfig::default(),
            database: DatabaseConfig {
                path: temp_dir.path().join("test.db"),
            },
            jobs: JobsConfig::default(),
            pipeline: pipeline_config.clone(),
            insight: None,
        };

        let telemetry = Arc::new(SqliteTelemetryStore::in_memory().expect("telemetry store"));
        let agent = Arc::new(MockAgent::new());
        let reader = Arc::new(MockWorkbookReader::new());
        let reporter = Arc::new(MockReportGenerator::new());

        let pipeline = Arc::new(RefreshPipeline::new(
            pipeline_config,
            telemetry.clone(),
            agent.clone(),
            reader.clone(),
        ));
        let executor = Arc::new(JobExecutor::new(
            pipeline.clone(),
            telemetry.clone(),
            Some(reporter.clone() as Arc<dyn ReportGenerator>),
        ));
        let store = Arc::new(MemoryJobStore::new(config.jobs.max_fallback_jobs));
        let jobs: Arc<dyn JobBackend> =
            Arc::new(FallbackBackend::new(store, executor, pipeline));

        let authenticator = create_authenticator(&config.auth).expect("authenticator");

        let state = Arc::new(rankwatch_server::state::AppState::new(
            config,
            Arc::from(authenticator),
            jobs,
        ));
        let router = rankwatch_server::api::create_router(state);

        Self {
            router,
            telemetry,
            agent,
            reader,
            reporter,
            temp_dir,
        }
    }

    /// Seed the newest roster snapshot with `count` collectable products.
    pub fn seed_roster(&self, count: usize) {
        let snapshot: Vec<(String, String, i64)> = (0..count)
            .map(|i| {
                let asin = format!("B0FIXTURE{i:01}");
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
                NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date"),
                &snapshot,
            )
            .expect("seed snapshot");
    }

    /// Script two successful agent batches producing one workbook each
    /// per seeded product.
    pub fn script_successful_run(&self) {
        for pair in [[0usize, 1], [2, 3]] {
            let files: Vec<String> = pair
                .iter()
                .map(|i| format!("B0FIXTURE{i:01}_daily.xlsx"))
                .collect();
            self.agent.push_batch(MockBatch::Succeed { files });
        }
        for i in 0..4 {
            let asin = format!("B0FIXTURE{i:01}");
            self.reader.insert_sheet(
                &format!("{asin}_daily.xlsx"),
                seeded_sheet(&asin, "2025-06-01", 24.99),
            );
        }
    }

    /// Poll a job endpoint until the record reaches a terminal status.
    pub async fn wait_for_terminal(&self, job_id: &str, key: &str) -> Value {
        for _ in 0..300 {
            let response = self.get_as(&format!("/api/v1/jobs/{job_id}"), key).await;
            assert_eq!(response.status, StatusCode::OK);
            let status = response.body["status"].as_str().unwrap_or_default().to_string();
            if status == "success" || status == "failed" {
                return response.body;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {job_id} never reached a terminal state");
    }

    /// Send a GET request without credentials.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None, None).await
    }

    /// Send a GET request with a bearer token.
    pub async fn get_as(&self, path: &str, key: &str) -> TestResponse {
        self.request("GET", path, None, Some(key)).await
    }

    /// Send a POST request with JSON body, without credentials.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body), None).await
    }

    /// Send a POST request with JSON body and a bearer token.
    pub async fn post_as(&self, path: &str, body: Value, key: &str) -> TestResponse {
        self.request("POST", path, Some(body), Some(key)).await
    }

    async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        key: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(key) = key {
            builder = builder.header("Authorization", format!("Bearer {key}"));
        }
        let request = if let Some(body) = body {
            builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap()
        } else {
            builder.body(Body::empty()).unwrap()
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).to_string();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body, text }
    }
}
