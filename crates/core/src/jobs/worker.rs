//! Queue consumer for the durable backend.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::broker::JobBroker;
use super::executor::{run_job, JobExecutor};
use super::store::JobStore;

const POP_TIMEOUT: Duration = Duration::from_secs(5);
const RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// Consume dispatches until the process is stopped. Jobs run one at a
/// time; broker errors back off and retry.
pub async fn run_worker(
    broker: Arc<dyn JobBroker>,
    store: Arc<dyn JobStore>,
    executor: Arc<JobExecutor>,
) {
    info!("worker started, waiting for dispatches");
    loop {
        match broker.pop(POP_TIMEOUT).await {
            Ok(Some(message)) => {
                info!(
                    job_id = %message.job_id,
                    dispatch_id = %message.dispatch_id,
                    "dispatch received"
                );
                run_job(store.clone(), executor.clone(), message.job_id).await;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "broker pop failed, backing off");
                tokio::time::sleep(RETRY_BACKOFF).await;
            }
        }
    }
}
