//! Commit discovery: full and incremental history fetches, and truncation.

use std::sync::Arc;

use async_trait::async_trait;

use crate::platform::{CommitQuery, PlatformClient};
use crate::store::{Store, TrackedRepository};

use super::CommitDiscovery;
use super::errors::{DiscoveryError, Result};
use super::types::{CommitSyncResult, DiscoveryOptions, TruncateResult};

/// [`CommitDiscovery`] over a remote client and the persistence port.
pub struct CommitDiscoveryService {
    platform: Arc<dyn PlatformClient>,
    store: Arc<dyn Store>,
    options: DiscoveryOptions,
}

impl CommitDiscoveryService {
    pub fn new(
        platform: Arc<dyn PlatformClient>,
        store: Arc<dyn Store>,
        options: DiscoveryOptions,
    ) -> Self {
        Self {
            platform,
            store,
            options,
        }
    }

    fn window(&self) -> CommitQuery {
        CommitQuery::window(self.options.commit_since, self.options.commit_until)
    }

    /// Fetch, store what is new, and credit authors for exactly the new commits.
    async fn ingest(
        &self,
        tracked: &TrackedRepository,
        query: CommitQuery,
    ) -> Result<CommitSyncResult> {
        let owner = tracked.owner.username.as_str();
        let name = tracked.repository.name.as_str();

        let commits = self.platform.list_commits(owner, name, &query).await?;
        let ingested = self
            .store
            .ingest_commits(tracked.repository.id, &commits)
            .await?;

        let result = CommitSyncResult {
            fetched: commits.len(),
            inserted: ingested.inserted.len(),
            author_increments: ingested.author_increments,
        };
        tracing::debug!(
            owner,
            repo = name,
            fetched = result.fetched,
            inserted = result.inserted,
            skipped = result.skipped(),
            "Ingested commits"
        );
        Ok(result)
    }
}

#[async_trait]
impl CommitDiscovery for CommitDiscoveryService {
    async fn fetch_full_history(&self, tracked: &TrackedRepository) -> Result<CommitSyncResult> {
        tracing::info!(repo = %tracked.full_name(), "Fetching full commit history");
        self.ingest(tracked, self.window()).await
    }

    async fn fetch_incremental(&self, tracked: &TrackedRepository) -> Result<CommitSyncResult> {
        let latest = self
            .store
            .most_recent_commit(tracked.repository.id)
            .await?;

        let query = match latest {
            Some(commit) => {
                tracing::debug!(
                    repo = %tracked.full_name(),
                    sha = %commit.sha,
                    "Fetching commits from latest stored"
                );
                self.window().starting_at(commit.sha)
            }
            None => self.window(),
        };
        self.ingest(tracked, query).await
    }

    async fn truncate_to(
        &self,
        owner: &str,
        name: &str,
        target_sha: &str,
    ) -> Result<TruncateResult> {
        let tracked = self
            .store
            .find_repository(owner, name)
            .await?
            .ok_or_else(|| DiscoveryError::repository_not_found(owner, name))?;

        let mut result = TruncateResult::default();
        for commit in self.store.list_commits(tracked.repository.id).await? {
            if commit.sha == target_sha {
                result.target_found = true;
                break;
            }
            self.store.delete_commit(commit.id).await?;
            result.deleted += 1;
        }

        if result.target_found {
            tracing::info!(
                owner,
                repo = name,
                sha = target_sha,
                deleted = result.deleted,
                "Truncated commit history"
            );
        } else {
            tracing::warn!(
                owner,
                repo = name,
                sha = target_sha,
                deleted = result.deleted,
                "Reset target not found, removed all commits"
            );
        }
        Ok(result)
    }
}

#[cfg(all(test, feature = "sqlite", feature = "migrate"))]
mod tests {
    use sea_orm::ConnectionTrait;

    use super::*;
    use crate::store::{AuthorStore, CommitStore, RepositoryStore, SqlStore, UserStore};
    use crate::test_support::{FakePlatform, commit, remote_repo, sqlite_store};

    struct Harness {
        platform: Arc<FakePlatform>,
        store: Arc<SqlStore>,
        discovery: CommitDiscoveryService,
    }

    async fn harness(options: DiscoveryOptions) -> Harness {
        let platform = Arc::new(FakePlatform::new());
        let store = Arc::new(sqlite_store().await);
        let discovery = CommitDiscoveryService::new(platform.clone(), store.clone(), options);
        Harness {
            platform,
            store,
            discovery,
        }
    }

    async fn tracked(store: &SqlStore, remote_id: i64, name: &str) -> TrackedRepository {
        let owner = store.upsert_user("octocat", None).await.expect("user");
        store
            .merge_repository(&owner, &remote_repo(remote_id, "octocat", name, 0))
            .await
            .expect("merge");
        store
            .find_repository("octocat", name)
            .await
            .expect("lookup")
            .expect("stored")
    }

    async fn stored_shas(store: &SqlStore, tracked: &TrackedRepository) -> Vec<String> {
        store
            .list_commits(tracked.repository.id)
            .await
            .expect("list")
            .into_iter()
            .map(|c| c.sha)
            .collect()
    }

    #[tokio::test]
    async fn failed_fetch_is_credited_in_full_on_retry() {
        let h = harness(DiscoveryOptions::unpaced()).await;
        let repo = tracked(&h.store, 1, "demo").await;
        h.platform.set_commits(
            "octocat",
            "demo",
            vec![commit("c2", "A"), commit("c1", "A")],
        );

        let db = h.store.connection();
        db.execute_unprepared("ALTER TABLE author_commit_counts RENAME TO parked_counts")
            .await
            .expect("park counts");
        let err = h
            .discovery
            .fetch_full_history(&repo)
            .await
            .expect_err("author credit should fail");
        assert!(matches!(err, DiscoveryError::Store(_)));
        assert!(stored_shas(&h.store, &repo).await.is_empty());

        db.execute_unprepared("ALTER TABLE parked_counts RENAME TO author_commit_counts")
            .await
            .expect("restore counts");
        let retry = h.discovery.fetch_full_history(&repo).await.expect("retry");

        assert_eq!(retry.inserted, 2);
        assert_eq!(stored_shas(&h.store, &repo).await, vec!["c2", "c1"]);
        assert_eq!(h.store.author_commit_count("A").await.expect("A"), Some(2));
    }

    #[tokio::test]
    async fn refetching_history_does_not_double_count_authors() {
        let h = harness(DiscoveryOptions::unpaced()).await;
        let repo = tracked(&h.store, 1, "demo").await;
        h.platform.set_commits(
            "octocat",
            "demo",
            vec![commit("c2", "A"), commit("c1", "B")],
        );

        let first = h.discovery.fetch_full_history(&repo).await.expect("first");
        h.platform.set_commits(
            "octocat",
            "demo",
            vec![commit("c3", "A"), commit("c2", "A"), commit("c1", "B")],
        );
        let second = h.discovery.fetch_full_history(&repo).await.expect("second");

        assert_eq!(first.inserted, 2);
        assert_eq!(second.fetched, 3);
        assert_eq!(second.inserted, 1);
        assert_eq!(second.skipped(), 2);
        assert_eq!(h.store.author_commit_count("A").await.expect("A"), Some(2));
        assert_eq!(h.store.author_commit_count("B").await.expect("B"), Some(1));
    }

    #[tokio::test]
    async fn author_totals_accumulate_across_repositories() {
        let h = harness(DiscoveryOptions::unpaced()).await;
        let alpha = tracked(&h.store, 1, "alpha").await;
        let beta = tracked(&h.store, 2, "beta").await;

        h.platform.set_commits(
            "octocat",
            "alpha",
            vec![commit("a2", "A"), commit("a1", "A")],
        );
        h.platform.set_commits(
            "octocat",
            "beta",
            vec![commit("b2", "A"), commit("b1", "C")],
        );

        let alpha_first = h.discovery.fetch_full_history(&alpha).await.expect("alpha");
        let beta_first = h.discovery.fetch_full_history(&beta).await.expect("beta");
        // Nothing new for A this time.
        let alpha_again = h.discovery.fetch_full_history(&alpha).await.expect("alpha again");

        assert_eq!(alpha_first.author_increments.get("A"), Some(&2));
        assert_eq!(beta_first.author_increments.get("A"), Some(&1));
        assert!(alpha_again.author_increments.is_empty());
        assert_eq!(h.store.author_commit_count("A").await.expect("A"), Some(3));
        assert_eq!(h.store.author_commit_count("C").await.expect("C"), Some(1));
    }

    #[tokio::test]
    async fn full_history_uses_the_configured_window_without_sha() {
        let options = DiscoveryOptions {
            commit_since: Some(crate::test_support::base_time()),
            ..DiscoveryOptions::unpaced()
        };
        let h = harness(options).await;
        let repo = tracked(&h.store, 1, "demo").await;

        h.discovery.fetch_full_history(&repo).await.expect("fetch");

        let queries = h.platform.commit_queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].1.sha, None);
        assert_eq!(queries[0].1.since, Some(crate::test_support::base_time()));
    }

    #[tokio::test]
    async fn incremental_starts_at_latest_stored_commit_and_credits_authors() {
        let h = harness(DiscoveryOptions::unpaced()).await;
        let repo = tracked(&h.store, 1, "demo").await;
        h.platform.set_commits(
            "octocat",
            "demo",
            vec![commit("c2", "A"), commit("c1", "A")],
        );
        h.discovery.fetch_full_history(&repo).await.expect("full");

        h.platform.set_commits(
            "octocat",
            "demo",
            vec![commit("c4", "B"), commit("c3", "B"), commit("c2", "A")],
        );
        let result = h.discovery.fetch_incremental(&repo).await.expect("incremental");

        let queries = h.platform.commit_queries();
        assert_eq!(queries[1].1.sha.as_deref(), Some("c2"));
        assert_eq!(result.inserted, 2);
        assert_eq!(h.store.author_commit_count("B").await.expect("B"), Some(2));
        assert_eq!(h.store.author_commit_count("A").await.expect("A"), Some(2));
    }

    #[tokio::test]
    async fn incremental_without_history_fetches_window() {
        let h = harness(DiscoveryOptions::unpaced()).await;
        let repo = tracked(&h.store, 1, "demo").await;

        h.discovery.fetch_incremental(&repo).await.expect("incremental");

        assert_eq!(h.platform.commit_queries()[0].1.sha, None);
    }

    #[tokio::test]
    async fn truncate_keeps_target_and_older() {
        let h = harness(DiscoveryOptions::unpaced()).await;
        let repo = tracked(&h.store, 1, "demo").await;
        h.platform.set_commits(
            "octocat",
            "demo",
            ["c5", "c4", "c3", "c2", "c1"]
                .into_iter()
                .map(|sha| commit(sha, "A"))
                .collect(),
        );
        h.discovery.fetch_full_history(&repo).await.expect("fetch");

        let result = h
            .discovery
            .truncate_to("octocat", "demo", "c3")
            .await
            .expect("truncate");

        assert!(result.target_found);
        assert_eq!(result.deleted, 2);
        assert_eq!(stored_shas(&h.store, &repo).await, vec!["c3", "c2", "c1"]);
    }

    #[tokio::test]
    async fn truncate_to_unknown_sha_removes_everything() {
        let h = harness(DiscoveryOptions::unpaced()).await;
        let repo = tracked(&h.store, 1, "demo").await;
        h.platform.set_commits(
            "octocat",
            "demo",
            vec![commit("c2", "A"), commit("c1", "A")],
        );
        h.discovery.fetch_full_history(&repo).await.expect("fetch");

        let result = h
            .discovery
            .truncate_to("octocat", "demo", "nope")
            .await
            .expect("truncate");

        assert!(!result.target_found);
        assert_eq!(result.deleted, 2);
        assert!(stored_shas(&h.store, &repo).await.is_empty());
        // Counts are cumulative and survive truncation.
        assert_eq!(h.store.author_commit_count("A").await.expect("A"), Some(2));
    }

    #[tokio::test]
    async fn truncate_unknown_repository_is_not_found() {
        let h = harness(DiscoveryOptions::unpaced()).await;
        let err = h
            .discovery
            .truncate_to("octocat", "ghost", "c1")
            .await
            .expect_err("missing repo");
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn remote_failure_stores_nothing() {
        let h = harness(DiscoveryOptions::unpaced()).await;
        let repo = tracked(&h.store, 1, "demo").await;
        h.platform.fail("octocat/demo");

        let err = h
            .discovery
            .fetch_full_history(&repo)
            .await
            .expect_err("scripted failure");

        assert!(matches!(err, DiscoveryError::Platform(_)));
        assert!(stored_shas(&h.store, &repo).await.is_empty());
    }
}
