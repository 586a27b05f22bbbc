//! Repository discovery: bulk backfill per user, on-demand fetch, rescans.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::entity::prelude::UserModel;
use crate::platform::{PlatformClient, PlatformRepo};
use crate::store::{MergeOutcome, Store, TrackedRepository};

use super::errors::{DiscoveryError, Result};
use super::types::{DiscoveryOptions, RescanResult, UserDiscoveryResult};
use super::{CommitDiscovery, RepositoryDiscovery};

/// [`RepositoryDiscovery`] driving a [`CommitDiscovery`] per repository.
pub struct RepositoryDiscoveryService {
    platform: Arc<dyn PlatformClient>,
    store: Arc<dyn Store>,
    commits: Arc<dyn CommitDiscovery>,
    options: DiscoveryOptions,
}

/// Sleep between loop iterations, skipping after the last one.
async fn pace(delay: Duration, index: usize, total: usize) {
    if !delay.is_zero() && index + 1 < total {
        tokio::time::sleep(delay).await;
    }
}

impl RepositoryDiscoveryService {
    pub fn new(
        platform: Arc<dyn PlatformClient>,
        store: Arc<dyn Store>,
        commits: Arc<dyn CommitDiscovery>,
        options: DiscoveryOptions,
    ) -> Self {
        Self {
            platform,
            store,
            commits,
            options,
        }
    }

    /// Merge one remote repository and backfill its history.
    async fn merge_and_backfill(
        &self,
        owner: &UserModel,
        remote: &PlatformRepo,
    ) -> Result<(MergeOutcome, usize)> {
        let outcome = self.store.merge_repository(owner, remote).await?;
        tracing::debug!(repo = %remote.full_name(), outcome = outcome.label(), "Merged repository");

        let tracked = TrackedRepository {
            repository: outcome.repository().clone(),
            owner: owner.clone(),
        };
        let commits = self.commits.fetch_full_history(&tracked).await?;
        Ok((outcome, commits.inserted))
    }

    /// Re-check one stored repository against the remote.
    ///
    /// Returns `None` when the remote `updated_at` has not moved.
    async fn refresh(&self, tracked: &TrackedRepository) -> Result<Option<usize>> {
        let remote = self
            .platform
            .get_repo(&tracked.owner.username, &tracked.repository.name)
            .await?;

        let incoming = remote.updated_at.map(|t| t.fixed_offset());
        if tracked.repository.remote_updated_at == incoming {
            return Ok(None);
        }

        let outcome = self
            .store
            .merge_repository(&tracked.owner, &remote)
            .await?;
        let refreshed = TrackedRepository {
            repository: outcome.into_repository(),
            owner: tracked.owner.clone(),
        };
        let commits = self.commits.fetch_incremental(&refreshed).await?;
        Ok(Some(commits.inserted))
    }
}

#[async_trait]
impl RepositoryDiscovery for RepositoryDiscoveryService {
    async fn discover_all_for_user(&self, username: &str) -> Result<UserDiscoveryResult> {
        let mut result = UserDiscoveryResult::default();

        let Some(user) = self.store.find_user(username).await? else {
            tracing::warn!(username, "User not found in storage, skipping discovery");
            result.user_missing = true;
            return Ok(result);
        };

        let remotes = self.platform.list_user_repos(username).await?;
        result.listed = remotes.len();
        tracing::info!(username, repos = result.listed, "Discovering repositories");

        for (index, remote) in remotes.iter().enumerate() {
            match self.merge_and_backfill(&user, remote).await {
                Ok((outcome, commits)) => {
                    match outcome {
                        MergeOutcome::Inserted(_) => result.inserted += 1,
                        MergeOutcome::Updated(_) => result.updated += 1,
                        MergeOutcome::Unchanged(_) => result.unchanged += 1,
                    }
                    result.commits_inserted += commits;
                }
                Err(e) => {
                    tracing::warn!(
                        repo = %remote.full_name(),
                        error = %e,
                        "Failed to discover repository"
                    );
                    result.errors.push(format!("{}: {}", remote.full_name(), e));
                }
            }
            pace(self.options.bulk_pacing, index, remotes.len()).await;
        }

        tracing::info!(
            username,
            inserted = result.inserted,
            updated = result.updated,
            unchanged = result.unchanged,
            commits = result.commits_inserted,
            errors = result.errors.len(),
            "Finished discovering repositories"
        );
        Ok(result)
    }

    async fn fetch_on_demand(&self, username: &str, repo_name: &str) -> Result<TrackedRepository> {
        let remote = self.platform.get_repo(username, repo_name).await?;

        let owner = self
            .store
            .find_user(username)
            .await?
            .ok_or_else(|| DiscoveryError::UserNotFound {
                username: username.to_string(),
            })?;

        let (outcome, commits) = self.merge_and_backfill(&owner, &remote).await?;
        tracing::info!(
            repo = %remote.full_name(),
            outcome = outcome.label(),
            commits,
            "Fetched requested repository"
        );
        Ok(TrackedRepository {
            repository: outcome.into_repository(),
            owner,
        })
    }

    async fn rescan_all(&self) -> Result<RescanResult> {
        let tracked = self.store.list_repositories().await?;
        let mut result = RescanResult::default();
        tracing::info!(repos = tracked.len(), "Rescanning repositories");

        for (index, repo) in tracked.iter().enumerate() {
            result.checked += 1;
            match self.refresh(repo).await {
                Ok(Some(commits)) => {
                    result.updated += 1;
                    result.commits_inserted += commits;
                }
                Ok(None) => result.unchanged += 1,
                Err(e) if e.is_not_found() => {
                    tracing::info!(repo = %repo.full_name(), "Repository no longer on remote");
                    result.errors.push(format!("{}: {}", repo.full_name(), e));
                }
                Err(e) => {
                    tracing::warn!(
                        repo = %repo.full_name(),
                        error = %e,
                        "Failed to rescan repository"
                    );
                    result.errors.push(format!("{}: {}", repo.full_name(), e));
                }
            }
            pace(self.options.rescan_pacing, index, tracked.len()).await;
        }

        tracing::info!(
            checked = result.checked,
            updated = result.updated,
            errors = result.errors.len(),
            "Rescan complete"
        );
        Ok(result)
    }
}

#[cfg(all(test, feature = "sqlite", feature = "migrate"))]
mod tests {
    use super::*;
    use crate::discovery::CommitDiscoveryService;
    use crate::store::{CommitStore, RepositoryStore, SqlStore, UserStore};
    use crate::test_support::{FakePlatform, commit, remote_repo, sqlite_store};

    struct Harness {
        platform: Arc<FakePlatform>,
        store: Arc<SqlStore>,
        discovery: RepositoryDiscoveryService,
    }

    async fn harness(options: DiscoveryOptions) -> Harness {
        let platform = Arc::new(FakePlatform::new());
        let store = Arc::new(sqlite_store().await);
        let commits = Arc::new(CommitDiscoveryService::new(
            platform.clone(),
            store.clone(),
            options.clone(),
        ));
        let discovery =
            RepositoryDiscoveryService::new(platform.clone(), store.clone(), commits, options);
        Harness {
            platform,
            store,
            discovery,
        }
    }

    async fn commit_count(store: &SqlStore, owner: &str, name: &str) -> usize {
        let tracked = store
            .find_repository(owner, name)
            .await
            .expect("lookup")
            .expect("stored");
        store
            .list_commits(tracked.repository.id)
            .await
            .expect("commits")
            .len()
    }

    #[tokio::test]
    async fn unknown_user_is_skipped_without_remote_calls() {
        let h = harness(DiscoveryOptions::unpaced()).await;

        let result = h
            .discovery
            .discover_all_for_user("ghost")
            .await
            .expect("not an error");

        assert!(result.user_missing);
        assert!(h.platform.calls().is_empty());
    }

    #[tokio::test]
    async fn bulk_discovery_merges_and_backfills_each_repository() {
        let h = harness(DiscoveryOptions::unpaced()).await;
        h.store.upsert_user("octocat", None).await.expect("user");
        h.platform.add_repo(remote_repo(1, "octocat", "alpha", 0));
        h.platform.add_repo(remote_repo(2, "octocat", "beta", 0));
        h.platform
            .set_commits("octocat", "alpha", vec![commit("a2", "A"), commit("a1", "A")]);
        h.platform
            .set_commits("octocat", "beta", vec![commit("b1", "B")]);

        let result = h
            .discovery
            .discover_all_for_user("octocat")
            .await
            .expect("discover");

        assert_eq!(result.listed, 2);
        assert_eq!(result.inserted, 2);
        assert_eq!(result.commits_inserted, 3);
        assert_eq!(commit_count(&h.store, "octocat", "alpha").await, 2);
        assert_eq!(commit_count(&h.store, "octocat", "beta").await, 1);
        assert_eq!(
            h.platform.calls(),
            vec![
                "list_user_repos octocat",
                "list_commits octocat/alpha",
                "list_commits octocat/beta",
            ]
        );
    }

    #[tokio::test]
    async fn bulk_discovery_continues_past_failing_repository() {
        let h = harness(DiscoveryOptions::unpaced()).await;
        h.store.upsert_user("octocat", None).await.expect("user");
        h.platform.add_repo(remote_repo(1, "octocat", "broken", 0));
        h.platform.add_repo(remote_repo(2, "octocat", "fine", 0));
        h.platform.set_commits("octocat", "fine", vec![commit("f1", "A")]);
        h.platform.fail("octocat/broken");

        let result = h
            .discovery
            .discover_all_for_user("octocat")
            .await
            .expect("partial progress is success");

        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("octocat/broken"));
        assert_eq!(commit_count(&h.store, "octocat", "fine").await, 1);
    }

    #[tokio::test]
    async fn bulk_discovery_paces_between_repositories() {
        let options = DiscoveryOptions {
            bulk_pacing: Duration::from_millis(50),
            ..DiscoveryOptions::unpaced()
        };
        let h = harness(options).await;
        h.store.upsert_user("octocat", None).await.expect("user");
        for (id, name) in [(1, "a"), (2, "b"), (3, "c")] {
            h.platform.add_repo(remote_repo(id, "octocat", name, 0));
        }

        let start = std::time::Instant::now();
        h.discovery
            .discover_all_for_user("octocat")
            .await
            .expect("discover");

        // Two gaps between three repositories, none after the last.
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn on_demand_fetch_stores_repository_and_history() {
        let h = harness(DiscoveryOptions::unpaced()).await;
        h.store.upsert_user("octocat", None).await.expect("user");
        h.platform.add_repo(remote_repo(9, "octocat", "wanted", 0));
        h.platform
            .set_commits("octocat", "wanted", vec![commit("w1", "A")]);

        let tracked = h
            .discovery
            .fetch_on_demand("octocat", "wanted")
            .await
            .expect("fetch");

        assert_eq!(tracked.full_name(), "octocat/wanted");
        assert_eq!(tracked.repository.remote_id, 9);
        assert_eq!(commit_count(&h.store, "octocat", "wanted").await, 1);
    }

    #[tokio::test]
    async fn on_demand_fetch_of_missing_remote_skips_commits() {
        let h = harness(DiscoveryOptions::unpaced()).await;
        h.store.upsert_user("octocat", None).await.expect("user");

        let err = h
            .discovery
            .fetch_on_demand("octocat", "nope")
            .await
            .expect_err("not on remote");

        assert!(err.is_not_found());
        assert_eq!(h.platform.calls(), vec!["get_repo octocat/nope"]);
    }

    #[tokio::test]
    async fn rescan_remerges_only_drifted_repositories() {
        let h = harness(DiscoveryOptions::unpaced()).await;
        let owner = h.store.upsert_user("octocat", None).await.expect("user");
        for (id, name) in [(1, "steady"), (2, "moving")] {
            h.store
                .merge_repository(&owner, &remote_repo(id, "octocat", name, 0))
                .await
                .expect("seed");
            h.platform.add_repo(remote_repo(id, "octocat", name, 0));
        }

        let mut moved = remote_repo(2, "octocat", "moving", 3);
        moved.stars = 500;
        h.platform.add_repo(moved);
        h.platform
            .set_commits("octocat", "moving", vec![commit("m1", "A")]);

        let result = h.discovery.rescan_all().await.expect("rescan");

        assert_eq!(result.checked, 2);
        assert_eq!(result.updated, 1);
        assert_eq!(result.unchanged, 1);
        assert_eq!(result.commits_inserted, 1);

        let moving = h
            .store
            .find_repository("octocat", "moving")
            .await
            .expect("lookup")
            .expect("stored");
        assert_eq!(moving.repository.stars, 500);
        assert!(!h
            .platform
            .calls()
            .contains(&"list_commits octocat/steady".to_string()));
    }

    #[tokio::test]
    async fn rescan_skips_failures_and_keeps_going() {
        let h = harness(DiscoveryOptions::unpaced()).await;
        let owner = h.store.upsert_user("octocat", None).await.expect("user");
        for (id, name) in [(1, "a-broken"), (2, "b-gone"), (3, "c-fine")] {
            h.store
                .merge_repository(&owner, &remote_repo(id, "octocat", name, 0))
                .await
                .expect("seed");
        }
        h.platform.add_repo(remote_repo(1, "octocat", "a-broken", 0));
        h.platform.add_repo(remote_repo(3, "octocat", "c-fine", 1));
        h.platform.fail("octocat/a-broken");

        let result = h.discovery.rescan_all().await.expect("rescan");

        assert_eq!(result.checked, 3);
        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.updated, 1);
    }
}
