use std::time::Duration;

use thiserror::Error;

use super::items::QueueKind;

#[derive(Debug, Error)]
pub enum TaskError {
    /// Shutdown has begun; the item was dropped.
    #[error("Orchestrator is shutting down, {queue} item dropped")]
    ShuttingDown { queue: QueueKind },

    #[error("Shutdown timed out after {timeout:?} with {pending} task(s) still running")]
    ShutdownTimeout { timeout: Duration, pending: usize },
}

impl TaskError {
    pub fn is_shutting_down(&self) -> bool {
        matches!(self, Self::ShuttingDown { .. })
    }
}
