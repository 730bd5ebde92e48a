use super::{
    types::{AuthMethod, Config, JobBackendKind},
    ConfigError,
};

/// Validate configuration beyond what serde enforces:
/// - server port is not 0
/// - api_key auth has at least one token
/// - durable jobs backend has a redis URL
/// - pipeline sizes are non-zero and the agent command is non-empty
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if matches!(config.auth.method, AuthMethod::ApiKey) && config.auth.tokens.is_empty() {
        return Err(ConfigError::ValidationError(
            "auth.method = \"api_key\" requires at least one [[auth.tokens]] entry".to_string(),
        ));
    }

    if config.jobs.backend == JobBackendKind::Durable && config.jobs.redis_url.is_none() {
        return Err(ConfigError::ValidationError(
            "jobs.backend = \"durable\" requires jobs.redis_url".to_string(),
        ));
    }

    if config.pipeline.agent_command.is_empty() {
        return Err(ConfigError::ValidationError(
            "pipeline.agent_command cannot be empty".to_string(),
        ));
    }

    if config.pipeline.roster_size == 0 {
        return Err(ConfigError::ValidationError(
            "pipeline.roster_size cannot be 0".to_string(),
        ));
    }

    if config.pipeline.batch_size == 0 {
        return Err(ConfigError::ValidationError(
            "pipeline.batch_size cannot be 0".to_string(),
        ));
    }

    Ok(())
}
