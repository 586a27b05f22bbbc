use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Pause between repositories during bulk discovery.
pub const DEFAULT_BULK_PACING: Duration = Duration::from_secs(180);

/// Pause between repositories during a rescan.
pub const DEFAULT_RESCAN_PACING: Duration = Duration::from_secs(90);

/// Knobs shared by repository and commit discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// Lower bound of the commit date window.
    pub commit_since: Option<DateTime<Utc>>,
    /// Upper bound of the commit date window.
    pub commit_until: Option<DateTime<Utc>>,
    pub bulk_pacing: Duration,
    pub rescan_pacing: Duration,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            commit_since: None,
            commit_until: None,
            bulk_pacing: DEFAULT_BULK_PACING,
            rescan_pacing: DEFAULT_RESCAN_PACING,
        }
    }
}

impl DiscoveryOptions {
    /// No pacing delays. Useful for tests and one-shot runs.
    pub fn unpaced() -> Self {
        Self {
            bulk_pacing: Duration::ZERO,
            rescan_pacing: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// Outcome of one commit fetch for one repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitSyncResult {
    /// Commits returned by the remote.
    pub fetched: usize,
    /// Commits that were new and got stored.
    pub inserted: usize,
    /// Per-author increments applied for the new commits.
    pub author_increments: BTreeMap<String, i64>,
}

impl CommitSyncResult {
    pub fn skipped(&self) -> usize {
        self.fetched.saturating_sub(self.inserted)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TruncateResult {
    pub deleted: usize,
    /// False when the target sha was never found and everything was removed.
    pub target_found: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserDiscoveryResult {
    /// The user could not be confirmed in storage; nothing was fetched.
    pub user_missing: bool,
    /// Repositories listed by the remote.
    pub listed: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub commits_inserted: usize,
    /// `owner/name` of repositories that failed, with the reason.
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RescanResult {
    pub checked: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub commits_inserted: usize,
    pub errors: Vec<String>,
}
