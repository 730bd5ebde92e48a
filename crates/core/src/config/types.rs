use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub insight: Option<InsightConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    "0.0.0.0".parse().unwrap()
}

fn default_port() -> u16 {
    8080
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub method: AuthMethod,
    /// Bearer tokens accepted when method = "api_key".
    #[serde(default)]
    pub tokens: Vec<TokenEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    None,
    ApiKey,
}

/// One accepted bearer token and the identity it maps to.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenEntry {
    pub key: String,
    pub user_id: String,
    #[serde(default)]
    pub role: crate::auth::Role,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("rankwatch.db")
}

/// Job execution configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobsConfig {
    /// Which execution backend drives job bodies.
    #[serde(default)]
    pub backend: JobBackendKind,
    /// Cap on the fallback backend's in-memory job table.
    #[serde(default = "default_max_fallback_jobs")]
    pub max_fallback_jobs: usize,
    /// Redis URL (required when backend = "durable").
    #[serde(default)]
    pub redis_url: Option<String>,
    /// Redis list the durable backend dispatches to.
    #[serde(default = "default_queue")]
    pub queue: String,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            backend: JobBackendKind::default(),
            max_fallback_jobs: default_max_fallback_jobs(),
            redis_url: None,
            queue: default_queue(),
        }
    }
}

/// Available job execution backends
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobBackendKind {
    /// In-process tokio tasks, capped in-memory job table.
    #[default]
    Fallback,
    /// SQLite job store + broker dispatch, executed by `rankwatch worker`.
    Durable,
}

fn default_max_fallback_jobs() -> usize {
    200
}

fn default_queue() -> String {
    "rankwatch:jobs".to_string()
}

/// Refresh pipeline configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Collection agent command: program followed by fixed arguments.
    /// The run output directory and `--url <target>` pairs are appended.
    #[serde(default = "default_agent_command")]
    pub agent_command: Vec<String>,
    /// Root under which run-scoped output directories are created.
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,
    /// Exact number of valid targets a refresh requires.
    #[serde(default = "default_roster_size")]
    pub roster_size: usize,
    /// Targets handed to the agent per invocation.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Wall-clock timeout per agent invocation.
    #[serde(default = "default_batch_timeout_secs")]
    pub batch_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            agent_command: default_agent_command(),
            output_root: default_output_root(),
            roster_size: default_roster_size(),
            batch_size: default_batch_size(),
            batch_timeout_secs: default_batch_timeout_secs(),
        }
    }
}

fn default_agent_command() -> Vec<String> {
    vec!["export-daily".to_string()]
}

fn default_output_root() -> PathBuf {
    PathBuf::from("exports")
}

fn default_roster_size() -> usize {
    100
}

fn default_batch_size() -> usize {
    10
}

fn default_batch_timeout_secs() -> u64 {
    1800
}

/// Insight report generation configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InsightConfig {
    /// Chat-completions endpoint URL.
    pub url: String,
    /// API key for the endpoint.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// Request timeout in seconds (default: 120)
    #[serde(default = "default_insight_timeout")]
    pub timeout_secs: u64,
}

fn default_insight_timeout() -> u64 {
    120
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub auth: SanitizedAuthConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jobs: SanitizedJobsConfig,
    pub pipeline: PipelineConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insight: Option<SanitizedInsightConfig>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAuthConfig {
    pub method: String,
    pub token_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedJobsConfig {
    pub backend: JobBackendKind,
    pub max_fallback_jobs: usize,
    pub redis_configured: bool,
    pub queue: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedInsightConfig {
    pub url: String,
    pub api_key_configured: bool,
    pub model: String,
    pub timeout_secs: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            auth: SanitizedAuthConfig {
                method: match config.auth.method {
                    AuthMethod::None => "none".to_string(),
                    AuthMethod::ApiKey => "api_key".to_string(),
                },
                token_count: config.auth.tokens.len(),
            },
            server: config.server.clone(),
            database: config.database.clone(),
            jobs: SanitizedJobsConfig {
                backend: config.jobs.backend,
                max_fallback_jobs: config.jobs.max_fallback_jobs,
                redis_configured: config.jobs.redis_url.is_some(),
                queue: config.jobs.queue.clone(),
            },
            pipeline: config.pipeline.clone(),
            insight: config.insight.as_ref().map(|i| SanitizedInsightConfig {
                url: i.url.clone(),
                api_key_configured: !i.api_key.is_empty(),
                model: i.model.clone(),
                timeout_secs: i.timeout_secs,
            }),
        }
    }
}
