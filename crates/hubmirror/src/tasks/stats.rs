use std::sync::atomic::{AtomicUsize, Ordering};

use super::items::QueueKind;

#[derive(Default)]
struct QueueCounters {
    enqueued: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
}

/// Live per-queue counters, updated by enqueuers and spawned work.
#[derive(Default)]
pub(crate) struct TaskStats {
    queues: [QueueCounters; 4],
}

impl TaskStats {
    fn counters(&self, kind: QueueKind) -> &QueueCounters {
        &self.queues[kind.index()]
    }

    pub(crate) fn record_enqueued(&self, kind: QueueKind) {
        self.counters(kind).enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_completed(&self, kind: QueueKind) {
        self.counters(kind).completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self, kind: QueueKind) {
        self.counters(kind).failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> TaskStatsSnapshot {
        let mut queues = [QueueStats::default(); 4];
        for kind in QueueKind::ALL {
            let counters = self.counters(kind);
            queues[kind.index()] = QueueStats {
                enqueued: counters.enqueued.load(Ordering::Relaxed),
                completed: counters.completed.load(Ordering::Relaxed),
                failed: counters.failed.load(Ordering::Relaxed),
            };
        }
        TaskStatsSnapshot { queues }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub enqueued: usize,
    pub completed: usize,
    pub failed: usize,
}

impl QueueStats {
    /// Items accepted but not yet finished either way.
    pub fn pending(&self) -> usize {
        self.enqueued.saturating_sub(self.completed + self.failed)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskStatsSnapshot {
    queues: [QueueStats; 4],
}

impl TaskStatsSnapshot {
    pub fn queue(&self, kind: QueueKind) -> QueueStats {
        self.queues[kind.index()]
    }

    pub fn total(&self) -> QueueStats {
        self.queues.iter().fold(QueueStats::default(), |acc, q| QueueStats {
            enqueued: acc.enqueued + q.enqueued,
            completed: acc.completed + q.completed,
            failed: acc.failed + q.failed,
        })
    }
}
