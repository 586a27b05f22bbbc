//! Repository and commit discovery.
//!
//! Discovery decides what to fetch from the remote and how to merge it. It
//! talks to the remote only through [`crate::platform::PlatformClient`] and to
//! storage only through [`crate::store::Store`].
//!
//! # Module Structure
//!
//! - [`CommitDiscovery`] / [`CommitDiscoveryService`] - per-repository
//!   history fetches and truncation
//! - [`RepositoryDiscovery`] / [`RepositoryDiscoveryService`] - per-user
//!   backfill, on-demand fetch and rescans
//!
//! # Example
//!
//! ```ignore
//! let commits = Arc::new(CommitDiscoveryService::new(
//!     client.clone(),
//!     store.clone(),
//!     options.clone(),
//! ));
//! let repos = RepositoryDiscoveryService::new(client, store, commits, options);
//! repos.discover_all_for_user("octocat").await?;
//! ```

mod commits;
mod errors;
mod repositories;
mod types;

use async_trait::async_trait;

use crate::store::TrackedRepository;

pub use commits::CommitDiscoveryService;
pub use errors::{DiscoveryError, Result};
pub use repositories::RepositoryDiscoveryService;
pub use types::{
    CommitSyncResult, DEFAULT_BULK_PACING, DEFAULT_RESCAN_PACING, DiscoveryOptions,
    RescanResult, TruncateResult, UserDiscoveryResult,
};

#[async_trait]
pub trait CommitDiscovery: Send + Sync {
    /// Fetch the configured date window with no sha bound and store new commits.
    async fn fetch_full_history(&self, tracked: &TrackedRepository) -> Result<CommitSyncResult>;

    /// Fetch starting at the most recently stored commit.
    async fn fetch_incremental(&self, tracked: &TrackedRepository) -> Result<CommitSyncResult>;

    /// Delete stored commits newest first until `target_sha`, which is kept.
    ///
    /// If `target_sha` is not stored, every commit of the repository is deleted.
    async fn truncate_to(&self, owner: &str, name: &str, target_sha: &str)
    -> Result<TruncateResult>;
}

#[async_trait]
pub trait RepositoryDiscovery: Send + Sync {
    /// Backfill every repository of a registered user, one at a time.
    async fn discover_all_for_user(&self, username: &str) -> Result<UserDiscoveryResult>;

    /// Fetch and backfill a single repository that was requested but not stored.
    async fn fetch_on_demand(&self, username: &str, repo_name: &str) -> Result<TrackedRepository>;

    /// Re-merge stored repositories whose remote `updated_at` moved.
    async fn rescan_all(&self) -> Result<RescanResult>;
}
