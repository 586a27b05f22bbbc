//! [`Store`](super::Store) over a sea-orm connection.

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::entity::prelude::{AuthorCommitCountModel, CommitModel, RepositoryModel, UserModel};
use crate::platform::{PlatformCommit, PlatformRepo};

use super::errors::{Result, StoreError};
use super::port::{
    AuthorStore, CommitIngest, CommitStore, MergeOutcome, RepositoryFilter, RepositoryStore,
    TrackedRepository, UserStore,
};
use super::{authors, commits, repositories, users};

#[derive(Clone)]
pub struct SqlStore {
    db: DatabaseConnection,
}

impl SqlStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl UserStore for SqlStore {
    async fn upsert_user(&self, username: &str, display_name: Option<&str>) -> Result<UserModel> {
        users::upsert(&self.db, username, display_name).await
    }

    async fn find_user(&self, username: &str) -> Result<Option<UserModel>> {
        users::find_by_username(&self.db, username).await
    }
}

#[async_trait]
impl RepositoryStore for SqlStore {
    async fn merge_repository(
        &self,
        owner: &UserModel,
        remote: &PlatformRepo,
    ) -> Result<MergeOutcome> {
        repositories::merge(&self.db, owner, remote).await
    }

    async fn find_repository(&self, owner: &str, name: &str) -> Result<Option<TrackedRepository>> {
        repositories::find_by_owner_and_name(&self.db, owner, name).await
    }

    async fn list_repositories(&self) -> Result<Vec<TrackedRepository>> {
        repositories::find_all(&self.db).await
    }

    async fn search_repositories(
        &self,
        owner_id: Uuid,
        filter: &RepositoryFilter,
    ) -> Result<Vec<RepositoryModel>> {
        repositories::search(&self.db, owner_id, filter).await
    }
}

#[async_trait]
impl CommitStore for SqlStore {
    async fn ingest_commits(
        &self,
        repository_id: Uuid,
        commits: &[PlatformCommit],
    ) -> Result<CommitIngest> {
        commits::ingest(&self.db, repository_id, commits).await
    }

    async fn most_recent_commit(&self, repository_id: Uuid) -> Result<Option<CommitModel>> {
        commits::find_most_recent(&self.db, repository_id).await
    }

    async fn list_commits(&self, repository_id: Uuid) -> Result<Vec<CommitModel>> {
        commits::find_by_repository(&self.db, repository_id).await
    }

    async fn delete_commit(&self, id: i64) -> Result<()> {
        match commits::delete(&self.db, id).await? {
            0 => Err(StoreError::not_found(format!("commit id={id}"))),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl AuthorStore for SqlStore {
    async fn add_author_commits(&self, author: &str, count: i64) -> Result<()> {
        authors::increment(&self.db, author, count).await
    }

    async fn author_commit_count(&self, author: &str) -> Result<Option<i64>> {
        authors::find_count(&self.db, author).await
    }

    async fn top_authors(&self, limit: u64) -> Result<Vec<AuthorCommitCountModel>> {
        authors::find_top(&self.db, limit).await
    }
}
