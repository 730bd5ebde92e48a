//! Queue transport for the durable backend.

use async_trait::async_trait;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use super::error::JobError;

/// Envelope pushed onto the queue; delivery is at-least-once, the job
/// lifecycle guards make redelivery harmless.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DispatchMessage {
    pub dispatch_id: String,
    pub job_id: String,
}

impl DispatchMessage {
    pub fn new(job_id: &str) -> Self {
        Self {
            dispatch_id: Uuid::new_v4().to_string(),
            job_id: job_id.to_string(),
        }
    }
}

/// Transport between the submitting server and the worker.
#[async_trait]
pub trait JobBroker: Send + Sync {
    async fn dispatch(&self, message: &DispatchMessage) -> Result<(), JobError>;

    /// Blocking pop with a timeout; `None` when the queue stayed empty.
    async fn pop(&self, timeout: Duration) -> Result<Option<DispatchMessage>, JobError>;
}

/// Redis list as the job queue: LPUSH to dispatch, BRPOP to consume.
pub struct RedisBroker {
    manager: redis::aio::ConnectionManager,
    queue: String,
}

impl RedisBroker {
    pub async fn connect(url: &str, queue: &str) -> Result<Self, JobError> {
        let client = redis::Client::open(url).map_err(|e| JobError::Queue(e.to_string()))?;
        let manager = redis::aio::ConnectionManager::new(client)
            .await
            .map_err(|e| JobError::Queue(e.to_string()))?;
        Ok(Self {
            manager,
            queue: queue.to_string(),
        })
    }
}

#[async_trait]
impl JobBroker for RedisBroker {
    async fn dispatch(&self, message: &DispatchMessage) -> Result<(), JobError> {
        let payload =
            serde_json::to_string(message).map_err(|e| JobError::Queue(e.to_string()))?;
        let mut conn = self.manager.clone();
        conn.lpush::<_, _, ()>(&self.queue, payload)
            .await
            .map_err(|e| JobError::Queue(e.to_string()))?;
        Ok(())
    }

    async fn pop(&self, timeout: Duration) -> Result<Option<DispatchMessage>, JobError> {
        let mut conn = self.manager.clone();
        let popped: Option<(String, String)> = conn
            .brpop(&self.queue, timeout.as_secs_f64())
            .await
            .map_err(|e| JobError::Queue(e.to_string()))?;
        match popped {
            Some((_, payload)) => {
                let message = serde_json::from_str(&payload)
                    .map_err(|e| JobError::Queue(format!("malformed dispatch: {e}")))?;
                Ok(Some(message))
            }
            None => Ok(None),
        }
    }
}
