//! Mock collection agent for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;
use tokio::sync::RwLock;

use crate::pipeline::{BatchOutput, CollectionAgent, PipelineError};

/// Scripted outcome for one agent batch.
#[derive(Debug, Clone)]
pub enum MockBatch {
    /// Exit cleanly, writing the named (empty) files into the output dir.
    Succeed { files: Vec<String> },
    /// Fail with the given detail.
    Fail(String),
    /// Simulate hitting the batch timeout.
    Timeout { secs: u64 },
}

/// Mock implementation of [`CollectionAgent`].
///
/// Batches are scripted up front with [`push_batch`](Self::push_batch);
/// unscripted batches succeed without writing anything. Every invocation's
/// URL list is recorded for assertions.
pub struct MockAgent {
    script: Mutex<VecDeque<MockBatch>>,
    calls: RwLock<Vec<Vec<String>>>,
}

impl Default for MockAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAgent {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            calls: RwLock::new(Vec::new()),
        }
    }

    /// Queue the outcome for the next unscripted batch.
    pub fn push_batch(&self, batch: MockBatch) {
        self.script.lock().unwrap().push_back(batch);
    }

    /// URL lists of every batch invoked so far.
    pub async fn calls(&self) -> Vec<Vec<String>> {
        self.calls.read().await.clone()
    }
}

#[async_trait]
impl CollectionAgent for MockAgent {
    async fn run_batch(
        &self,
        output_dir: &Path,
        urls: &[String],
    ) -> Result<BatchOutput, PipelineError> {
        self.calls.write().await.push(urls.to_vec());

        let batch = self.script.lock().unwrap().pop_front();
        match batch.unwrap_or(MockBatch::Succeed { files: vec![] }) {
            MockBatch::Succeed { files } => {
                for file in &files {
                    tokio::fs::write(output_dir.join(file), b"").await?;
                }
                Ok(BatchOutput {
                    stdout_tail: format!("collected {} urls", urls.len()),
                })
            }
            MockBatch::Fail(detail) => Err(PipelineError::AgentFailed { detail }),
            MockBatch::Timeout { secs } => Err(PipelineError::AgentTimeout { secs }),
        }
    }
}
