use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rankwatch_core::{
    create_authenticator, load_config, run_worker, validate_config, Authenticator, Config,
    DurableBackend, FallbackBackend, HttpReportGenerator, JobBackend, JobBackendKind, JobExecutor,
    MemoryJobStore, ProcessAgent, RedisBroker, RefreshPipeline, ReportGenerator,
    SqliteJobStore, SqliteTelemetryStore, XlsxReader,
};
use rankwatch_core::jobs::{JobBroker, JobStore};

use rankwatch_server::api::create_router;
use rankwatch_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("RANKWATCH_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully (version {})", VERSION);
    info!("Auth method: {:?}", config.auth.method);
    info!("Database path: {:?}", config.database.path);
    info!("Job backend: {:?}", config.jobs.backend);

    // Log a config fingerprint so deployments are distinguishable
    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!("Config hash: {}", &config_hash[..16]);

    // Telemetry store and pipeline
    let telemetry = Arc::new(
        SqliteTelemetryStore::new(&config.database.path)
            .context("Failed to create telemetry store")?,
    );
    let agent = Arc::new(ProcessAgent::new(&config.pipeline));
    let reader = Arc::new(XlsxReader::new());
    let pipeline = Arc::new(RefreshPipeline::new(
        config.pipeline.clone(),
        telemetry.clone(),
        agent,
        reader,
    ));

    // Report generator, when insight is configured
    let reporter: Option<Arc<dyn ReportGenerator>> = match &config.insight {
        Some(insight_config) => {
            info!("Insight generation enabled (model: {})", insight_config.model);
            Some(Arc::new(
                HttpReportGenerator::new(insight_config)
                    .context("Failed to create report generator")?,
            ))
        }
        None => {
            info!("Insight generation not configured");
            None
        }
    };

    let executor = Arc::new(JobExecutor::new(
        pipeline.clone(),
        telemetry.clone(),
        reporter,
    ));

    let worker_mode = std::env::args().nth(1).as_deref() == Some("worker");

    match config.jobs.backend {
        JobBackendKind::Durable => {
            let redis_url = config
                .jobs
                .redis_url
                .as_deref()
                .context("durable backend requires jobs.redis_url")?;
            let broker: Arc<dyn JobBroker> = Arc::new(
                RedisBroker::connect(redis_url, &config.jobs.queue)
                    .await
                    .context("Failed to connect to the job queue")?,
            );
            let store: Arc<dyn JobStore> = Arc::new(
                SqliteJobStore::new(&config.database.path)
                    .context("Failed to create job store")?,
            );

            if worker_mode {
                run_worker(broker, store, executor).await;
                return Ok(());
            }

            let insight_enabled = executor.insight_enabled();
            let backend: Arc<dyn JobBackend> = Arc::new(DurableBackend::new(
                store,
                broker,
                pipeline.clone(),
                insight_enabled,
            ));
            serve(config, backend).await
        }
        JobBackendKind::Fallback => {
            if worker_mode {
                bail!("worker mode requires the durable job backend");
            }
            let store: Arc<dyn JobStore> =
                Arc::new(MemoryJobStore::new(config.jobs.max_fallback_jobs));
            let backend: Arc<dyn JobBackend> = Arc::new(FallbackBackend::new(
                store,
                executor,
                pipeline.clone(),
            ));
            serve(config, backend).await
        }
    }
}

async fn serve(config: Config, backend: Arc<dyn JobBackend>) -> Result<()> {
    let authenticator: Arc<dyn Authenticator> = Arc::from(
        create_authenticator(&config.auth).context("Failed to create authenticator")?,
    );
    info!("Using authenticator: {}", authenticator.method_name());

    let addr = SocketAddr::new(config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, authenticator, backend));
    let app = create_router(state);

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
