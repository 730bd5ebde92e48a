//! In-process broker for testing the durable backend.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

use crate::jobs::{DispatchMessage, JobBroker, JobError};

/// Mock implementation of [`JobBroker`] over an in-process channel.
pub struct MockBroker {
    tx: mpsc::UnboundedSender<DispatchMessage>,
    rx: Mutex<mpsc::UnboundedReceiver<DispatchMessage>>,
    fail_dispatch: AtomicBool,
}

impl Default for MockBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBroker {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
            fail_dispatch: AtomicBool::new(false),
        }
    }

    /// Make every subsequent dispatch fail, like an unreachable queue.
    pub fn set_fail_dispatch(&self, fail: bool) {
        self.fail_dispatch.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl JobBroker for MockBroker {
    async fn dispatch(&self, message: &DispatchMessage) -> Result<(), JobError> {
        if self.fail_dispatch.load(Ordering::SeqCst) {
            return Err(JobError::Queue("queue unreachable".to_string()));
        }
        self.tx
            .send(message.clone())
            .map_err(|e| JobError::Queue(e.to_string()))
    }

    async fn pop(&self, timeout: Duration) -> Result<Option<DispatchMessage>, JobError> {
        let mut rx = self.rx.lock().await;
        match tokio::time::timeout(timeout, rx.recv()).await {
            Ok(Some(message)) => Ok(Some(message)),
            Ok(None) => Err(JobError::Queue("broker channel closed".to_string())),
            Err(_) => Ok(None),
        }
    }
}
