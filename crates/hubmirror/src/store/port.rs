//! Storage-agnostic contracts consumed by discovery and the read path.

use std::collections::BTreeMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::entity::prelude::{AuthorCommitCountModel, CommitModel, RepositoryModel, UserModel};
use crate::platform::{PlatformCommit, PlatformRepo};

use super::errors::Result;

/// Result of merging a remote repository into storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// First observation of this `remote_id`.
    Inserted(RepositoryModel),
    /// Stored `remote_updated_at` already matched; nothing was written.
    Unchanged(RepositoryModel),
    /// Metadata was stale and has been overwritten in place.
    Updated(RepositoryModel),
}

impl MergeOutcome {
    pub fn repository(&self) -> &RepositoryModel {
        match self {
            Self::Inserted(r) | Self::Unchanged(r) | Self::Updated(r) => r,
        }
    }

    pub fn into_repository(self) -> RepositoryModel {
        match self {
            Self::Inserted(r) | Self::Unchanged(r) | Self::Updated(r) => r,
        }
    }

    /// Whether the merge wrote anything.
    pub fn is_changed(&self) -> bool {
        !matches!(self, Self::Unchanged(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Inserted(_) => "inserted",
            Self::Unchanged(_) => "unchanged",
            Self::Updated(_) => "updated",
        }
    }
}

/// Commits stored by one ingestion, with the author credit applied for them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitIngest {
    /// Newly stored commits, oldest first.
    pub inserted: Vec<PlatformCommit>,
    pub author_increments: BTreeMap<String, i64>,
}

/// A stored repository together with its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedRepository {
    pub repository: RepositoryModel,
    pub owner: UserModel,
}

impl TrackedRepository {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner.username, self.repository.name)
    }
}

/// Narrowing for an owner's repository listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryFilter {
    /// Substring match on the repository name.
    pub name: Option<String>,
    /// Exact match on the primary language.
    pub language: Option<String>,
    /// Keep only the N most-starred repositories.
    pub top_stars: Option<u64>,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn upsert_user(&self, username: &str, display_name: Option<&str>) -> Result<UserModel>;

    async fn find_user(&self, username: &str) -> Result<Option<UserModel>>;
}

#[async_trait]
pub trait RepositoryStore: Send + Sync {
    /// Idempotent upsert keyed by `remote_id`.
    async fn merge_repository(
        &self,
        owner: &UserModel,
        remote: &PlatformRepo,
    ) -> Result<MergeOutcome>;

    async fn find_repository(&self, owner: &str, name: &str) -> Result<Option<TrackedRepository>>;

    async fn list_repositories(&self) -> Result<Vec<TrackedRepository>>;

    async fn search_repositories(
        &self,
        owner_id: Uuid,
        filter: &RepositoryFilter,
    ) -> Result<Vec<RepositoryModel>>;
}

#[async_trait]
pub trait CommitStore: Send + Sync {
    /// Insert commits whose sha is new and add them to their authors' counts.
    ///
    /// Atomic: either every new commit is stored and credited, or nothing is.
    async fn ingest_commits(
        &self,
        repository_id: Uuid,
        commits: &[PlatformCommit],
    ) -> Result<CommitIngest>;

    /// Latest by local insertion order.
    async fn most_recent_commit(&self, repository_id: Uuid) -> Result<Option<CommitModel>>;

    /// Newest inserted first.
    async fn list_commits(&self, repository_id: Uuid) -> Result<Vec<CommitModel>>;

    async fn delete_commit(&self, id: i64) -> Result<()>;
}

#[async_trait]
pub trait AuthorStore: Send + Sync {
    /// Add to an author's cumulative count. Never overwrites.
    async fn add_author_commits(&self, author: &str, count: i64) -> Result<()>;

    async fn author_commit_count(&self, author: &str) -> Result<Option<i64>>;

    /// Ordered by count descending, then author ascending.
    async fn top_authors(&self, limit: u64) -> Result<Vec<AuthorCommitCountModel>>;
}

/// Everything discovery and the read path need from storage.
pub trait Store: UserStore + RepositoryStore + CommitStore + AuthorStore {}

impl<T> Store for T where T: UserStore + RepositoryStore + CommitStore + AuthorStore {}
