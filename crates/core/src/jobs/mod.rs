//! Job tracking and execution.
//!
//! Jobs move through pending, running, and a terminal success or failed
//! state, and terminal states never change again. Two backends share the
//! same store trait and job body: the fallback backend runs jobs on
//! spawned tasks over a bounded in-memory table, the durable backend
//! persists to SQLite and dispatches through a queue to worker processes.

mod backend;
mod broker;
mod error;
mod executor;
mod memory;
mod sqlite;
mod store;
mod types;
mod worker;

pub use backend::{DurableBackend, FallbackBackend, JobBackend};
pub use broker::{DispatchMessage, JobBroker, RedisBroker};
pub use error::JobError;
pub use executor::{run_job, JobExecutor};
pub use memory::MemoryJobStore;
pub use sqlite::SqliteJobStore;
pub use store::JobStore;
pub use types::{
    InsightListFilter, Job, JobKind, JobRequest, JobStatus, ALLOWED_RANGE_DAYS, ERROR_MESSAGE_CAP,
};
pub use worker::run_worker;
