//! Work items carried by the orchestrator queues. Never persisted.

/// The four activity classes, one queue each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueKind {
    DiscoverUser,
    FetchRepository,
    Rescan,
    ResetRepository,
}

impl QueueKind {
    pub const ALL: [QueueKind; 4] = [
        QueueKind::DiscoverUser,
        QueueKind::FetchRepository,
        QueueKind::Rescan,
        QueueKind::ResetRepository,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            QueueKind::DiscoverUser => "discover_user",
            QueueKind::FetchRepository => "fetch_repository",
            QueueKind::Rescan => "rescan",
            QueueKind::ResetRepository => "reset_repository",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            QueueKind::DiscoverUser => 0,
            QueueKind::FetchRepository => 1,
            QueueKind::Rescan => 2,
            QueueKind::ResetRepository => 3,
        }
    }
}

impl std::fmt::Display for QueueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backfill every repository of a newly registered user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoverUser {
    pub username: String,
}

/// A repository was requested but is not stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRepository {
    pub username: String,
    pub repo_name: String,
}

/// Token that triggers one full rescan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RescanSignal;

/// Truncate a stored history back to `target_sha`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetRepository {
    pub owner: String,
    pub repo_name: String,
    pub target_sha: String,
}
