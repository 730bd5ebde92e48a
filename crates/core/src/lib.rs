pub mod auth;
pub mod config;
pub mod extractor;
pub mod insight;
pub mod jobs;
pub mod pipeline;
pub mod telemetry;
pub mod testing;

pub use auth::{
    create_authenticator, ApiKeyAuthenticator, AuthError, AuthRequest, Authenticator, Identity,
    NoneAuthenticator, Role,
};
pub use config::{
    load_config, load_config_from_str, validate_config, AuthMethod, Config, ConfigError,
    JobBackendKind, SanitizedConfig,
};
pub use extractor::{ExtractError, WorkbookReader, XlsxReader};
pub use insight::{HttpReportGenerator, InsightError, ReportGenerator};
pub use jobs::{
    run_worker, DurableBackend, FallbackBackend, Job, JobBackend, JobError, JobExecutor, JobKind,
    JobRequest, JobStatus, MemoryJobStore, RedisBroker, SqliteJobStore,
};
pub use pipeline::{CollectionAgent, PipelineError, ProcessAgent, RefreshPipeline, RefreshReport};
pub use telemetry::{SiteCode, SqliteTelemetryStore, TelemetryError, TelemetryRow, TelemetryStore};
