use std::sync::Arc;

use rankwatch_core::{Authenticator, Config, JobBackend, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    jobs: Arc<dyn JobBackend>,
}

impl AppState {
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        jobs: Arc<dyn JobBackend>,
    ) -> Self {
        Self {
            config,
            authenticator,
            jobs,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn jobs(&self) -> &dyn JobBackend {
        self.jobs.as_ref()
    }
}
