//! Background task orchestration.
//!
//! Four unbounded FIFO queues, one per activity class, feed discovery work to
//! spawned tasks. Enqueueing never blocks the caller. Items are held in memory
//! only; a restart loses anything still queued.
//!
//! ```text
//! enqueue_* ──► queue ──► dispatcher ──► spawned task ──► RepositoryDiscovery / CommitDiscovery
//! ```
//!
//! Shutdown closes the queues, lets dispatchers drain what was already
//! accepted and waits (bounded) for in-flight tasks.

mod errors;
mod items;
mod manager;
mod stats;

pub use errors::TaskError;
pub use items::{DiscoverUser, FetchRepository, QueueKind, RescanSignal, ResetRepository};
pub use manager::{
    DEFAULT_RESCAN_COOLDOWN, DEFAULT_SHUTDOWN_TIMEOUT, ShutdownReport, TaskManager, TaskOptions,
};
pub use stats::{QueueStats, TaskStatsSnapshot};

/// Producer side of the orchestrator.
///
/// Every method returns immediately. An error means the orchestrator is
/// shutting down and the item was dropped (and logged); callers treat it as
/// non-fatal.
pub trait TaskQueue: Send + Sync {
    fn enqueue_user_discovery(&self, username: &str) -> Result<(), TaskError>;

    fn enqueue_repository_fetch(&self, username: &str, repo_name: &str) -> Result<(), TaskError>;

    fn enqueue_rescan(&self) -> Result<(), TaskError>;

    fn enqueue_reset(&self, owner: &str, repo_name: &str, target_sha: &str)
    -> Result<(), TaskError>;
}
