//! Read path and request intake.
//!
//! [`MirrorService`] answers queries from storage and turns requests for data
//! that is not mirrored yet into background work. It never talks to the
//! remote directly.

use std::sync::Arc;

use thiserror::Error;

use crate::entity::prelude::{AuthorCommitCountModel, CommitModel, RepositoryModel, UserModel};
use crate::store::{RepositoryFilter, Store, StoreError, TrackedRepository};
use crate::tasks::TaskQueue;

/// GitHub login limit.
const MAX_USERNAME_LEN: usize = 39;

/// GitHub repository name limit.
const MAX_REPO_NAME_LEN: usize = 100;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("User {username} is not registered")]
    UserNotFound { username: String },

    /// Not mirrored yet; an on-demand fetch has been queued.
    #[error("Repository {owner}/{name} is not mirrored yet, it will be fetched shortly")]
    RepositoryPending { owner: String, name: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UserNotFound { .. } | Self::RepositoryPending { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;

/// Validate a GitHub login: alphanumerics and single inner hyphens.
fn validate_username(username: &str) -> Result<()> {
    if username.is_empty() || username.len() > MAX_USERNAME_LEN {
        return Err(ServiceError::invalid(format!(
            "username must be 1 to {MAX_USERNAME_LEN} characters"
        )));
    }
    let valid_chars = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-');
    if !valid_chars
        || username.starts_with('-')
        || username.ends_with('-')
        || username.contains("--")
    {
        return Err(ServiceError::invalid(format!(
            "'{username}' is not a valid GitHub username"
        )));
    }
    Ok(())
}

/// Validate a GitHub repository name: ASCII alphanumerics, `.`, `_` and `-`.
fn validate_repo_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_REPO_NAME_LEN {
        return Err(ServiceError::invalid(format!(
            "repository name must be 1 to {MAX_REPO_NAME_LEN} characters"
        )));
    }
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if !valid_chars || name == "." || name == ".." {
        return Err(ServiceError::invalid(format!(
            "'{name}' is not a valid GitHub repository name"
        )));
    }
    Ok(())
}

fn require(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ServiceError::invalid(format!("{field} must not be empty")));
    }
    Ok(())
}

#[derive(Clone)]
pub struct MirrorService {
    store: Arc<dyn Store>,
    tasks: Arc<dyn TaskQueue>,
}

impl MirrorService {
    pub fn new(store: Arc<dyn Store>, tasks: Arc<dyn TaskQueue>) -> Self {
        Self { store, tasks }
    }

    /// Register (or re-register) a user and queue a backfill of their repositories.
    pub async fn register_user(
        &self,
        username: &str,
        display_name: Option<&str>,
    ) -> Result<UserModel> {
        validate_username(username)?;
        let display_name = display_name.map(str::trim).filter(|n| !n.is_empty());

        let user = self.store.upsert_user(username, display_name).await?;
        tracing::info!(username, user_id = %user.id, "User registered");

        // A dropped item is already logged by the queue.
        let _ = self.tasks.enqueue_user_discovery(username);
        Ok(user)
    }

    async fn require_user(&self, username: &str) -> Result<UserModel> {
        self.store
            .find_user(username)
            .await?
            .ok_or_else(|| ServiceError::UserNotFound {
                username: username.to_string(),
            })
    }

    /// Look up a stored repository, queueing a fetch when it is missing.
    async fn require_repository(&self, owner: &str, name: &str) -> Result<TrackedRepository> {
        validate_username(owner)?;
        validate_repo_name(name)?;
        self.require_user(owner).await?;

        match self.store.find_repository(owner, name).await? {
            Some(tracked) => Ok(tracked),
            None => {
                tracing::debug!(owner, name, "Repository not mirrored, queueing fetch");
                let _ = self.tasks.enqueue_repository_fetch(owner, name);
                Err(ServiceError::RepositoryPending {
                    owner: owner.to_string(),
                    name: name.to_string(),
                })
            }
        }
    }

    pub async fn get_repository(&self, owner: &str, name: &str) -> Result<RepositoryModel> {
        Ok(self.require_repository(owner, name).await?.repository)
    }

    pub async fn list_user_repositories(
        &self,
        owner: &str,
        filter: &RepositoryFilter,
    ) -> Result<Vec<RepositoryModel>> {
        validate_username(owner)?;
        let user = self.require_user(owner).await?;
        Ok(self.store.search_repositories(user.id, filter).await?)
    }

    /// Stored commits, newest first.
    pub async fn list_commits(&self, owner: &str, name: &str) -> Result<Vec<CommitModel>> {
        let tracked = self.require_repository(owner, name).await?;
        Ok(self.store.list_commits(tracked.repository.id).await?)
    }

    /// Queue a truncation of `owner/name` back to `target_sha`.
    pub async fn request_reset(&self, owner: &str, name: &str, target_sha: &str) -> Result<()> {
        require(target_sha, "sha")?;
        let tracked = self.require_repository(owner, name).await?;
        let _ = self
            .tasks
            .enqueue_reset(&tracked.owner.username, &tracked.repository.name, target_sha);
        tracing::info!(repository = %tracked.full_name(), target_sha, "Reset requested");
        Ok(())
    }

    pub async fn top_authors(&self, n: u64) -> Result<Vec<AuthorCommitCountModel>> {
        if n == 0 {
            return Err(ServiceError::invalid("n must be at least 1"));
        }
        Ok(self.store.top_authors(n).await?)
    }
}
