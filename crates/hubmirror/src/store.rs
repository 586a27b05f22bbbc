//! Persistence port for users, repositories, commits and author counts.
//!
//! Discovery and the read path depend only on the traits in this module
//! ([`UserStore`], [`RepositoryStore`], [`CommitStore`], [`AuthorStore`], or
//! all of them as [`Store`]). [`SqlStore`] implements them over sea-orm.
//!
//! # Example
//!
//! ```ignore
//! use hubmirror::store::{RepositoryStore, SqlStore};
//!
//! let store = SqlStore::new(hubmirror::connect_and_migrate(url).await?);
//! let outcome = store.merge_repository(&owner, &remote).await?;
//! ```

mod authors;
mod commits;
mod errors;
mod port;
mod repositories;
mod sql;
mod users;

pub use errors::{Result, StoreError};
pub use port::{
    AuthorStore, CommitIngest, CommitStore, MergeOutcome, RepositoryFilter, RepositoryStore,
    Store, TrackedRepository, UserStore,
};
pub use sql::SqlStore;

#[cfg(all(test, feature = "sqlite", feature = "migrate"))]
mod tests {
    use sea_orm::ConnectionTrait;

    use super::*;
    use crate::test_support::{commit, remote_repo, sqlite_store};

    #[tokio::test]
    async fn upsert_user_refreshes_display_name_only_when_given() {
        let store = sqlite_store().await;

        let first = store.upsert_user("octocat", Some("Octo Cat")).await.expect("insert");
        let renamed = store.upsert_user("octocat", Some("The Octocat")).await.expect("rename");
        let untouched = store.upsert_user("octocat", None).await.expect("noop");

        assert_eq!(first.id, renamed.id);
        assert_eq!(renamed.display_name.as_deref(), Some("The Octocat"));
        assert_eq!(untouched.display_name.as_deref(), Some("The Octocat"));
        assert_eq!(untouched.created_at, first.created_at);
    }

    #[tokio::test]
    async fn merging_unchanged_repository_twice_writes_nothing() {
        let store = sqlite_store().await;
        let owner = store.upsert_user("octocat", None).await.expect("user");
        let remote = remote_repo(1, "octocat", "demo", 0);

        let first = store.merge_repository(&owner, &remote).await.expect("first merge");
        let before = store
            .find_repository("octocat", "demo")
            .await
            .expect("lookup")
            .expect("stored");
        let second = store.merge_repository(&owner, &remote).await.expect("second merge");
        let after = store
            .find_repository("octocat", "demo")
            .await
            .expect("lookup")
            .expect("stored");

        assert!(matches!(first, MergeOutcome::Inserted(_)));
        assert!(matches!(second, MergeOutcome::Unchanged(_)));
        assert!(!second.is_changed());
        assert_eq!(before, after);
        assert_eq!(store.list_repositories().await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn stale_repository_is_updated_in_place() {
        let store = sqlite_store().await;
        let owner = store.upsert_user("octocat", None).await.expect("user");
        let original = remote_repo(1, "octocat", "demo", 0);
        let inserted = store
            .merge_repository(&owner, &original)
            .await
            .expect("insert")
            .into_repository();

        let mut changed = remote_repo(1, "octocat", "demo-renamed", 1);
        changed.stars = 99;
        let outcome = store.merge_repository(&owner, &changed).await.expect("update");

        assert!(matches!(outcome, MergeOutcome::Updated(_)));
        let updated = outcome.repository();
        assert_eq!(updated.id, inserted.id);
        assert_eq!(updated.name, "demo-renamed");
        assert_eq!(updated.stars, 99);
        assert_eq!(store.list_repositories().await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn concurrent_merges_of_one_remote_id_keep_one_row() {
        let store = sqlite_store().await;
        let owner = store.upsert_user("octocat", None).await.expect("user");
        let remote = remote_repo(7, "octocat", "race", 0);

        let (a, b) = tokio::join!(
            store.merge_repository(&owner, &remote),
            store.merge_repository(&owner, &remote)
        );

        let a = a.expect("first merge");
        let b = b.expect("second merge");
        assert_eq!(a.repository().id, b.repository().id);
        assert_eq!(store.list_repositories().await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn repeated_commits_are_skipped() {
        let store = sqlite_store().await;
        let owner = store.upsert_user("octocat", None).await.expect("user");
        let repo = store
            .merge_repository(&owner, &remote_repo(1, "octocat", "demo", 0))
            .await
            .expect("repo")
            .into_repository();

        // Newest first, as the remote lists them.
        let batch = vec![commit("c3", "Ada"), commit("c2", "Ada"), commit("c1", "Grace")];
        let first = store.ingest_commits(repo.id, &batch).await.expect("first");
        let overlap = vec![commit("c4", "Grace"), commit("c3", "Ada")];
        let second = store.ingest_commits(repo.id, &overlap).await.expect("second");

        assert_eq!(first.inserted.len(), 3);
        assert_eq!(first.author_increments.get("Ada"), Some(&2));
        assert_eq!(second.inserted.len(), 1);
        assert_eq!(second.inserted[0].sha, "c4");
        assert_eq!(second.author_increments.len(), 1);
        assert_eq!(store.author_commit_count("Ada").await.expect("Ada"), Some(2));
        assert_eq!(store.author_commit_count("Grace").await.expect("Grace"), Some(2));

        let listed: Vec<_> = store
            .list_commits(repo.id)
            .await
            .expect("list")
            .into_iter()
            .map(|c| c.sha)
            .collect();
        assert_eq!(listed, vec!["c4", "c3", "c2", "c1"]);

        let latest = store.most_recent_commit(repo.id).await.expect("latest");
        assert_eq!(latest.map(|c| c.sha).as_deref(), Some("c4"));
    }

    #[tokio::test]
    async fn failed_author_credit_rolls_back_the_commits() {
        let store = sqlite_store().await;
        let owner = store.upsert_user("octocat", None).await.expect("user");
        let repo = store
            .merge_repository(&owner, &remote_repo(1, "octocat", "demo", 0))
            .await
            .expect("repo")
            .into_repository();
        let batch = vec![commit("c2", "Ada"), commit("c1", "Ada")];

        // Make every author increment fail while the commit table still works.
        let park = "ALTER TABLE author_commit_counts RENAME TO parked_counts";
        let restore = "ALTER TABLE parked_counts RENAME TO author_commit_counts";
        store
            .connection()
            .execute_unprepared(park)
            .await
            .expect("park counts");
        store
            .ingest_commits(repo.id, &batch)
            .await
            .expect_err("crediting authors should fail");
        assert!(store.list_commits(repo.id).await.expect("list").is_empty());

        store
            .connection()
            .execute_unprepared(restore)
            .await
            .expect("restore counts");
        let retry = store.ingest_commits(repo.id, &batch).await.expect("retry");

        assert_eq!(retry.inserted.len(), 2);
        assert_eq!(store.author_commit_count("Ada").await.expect("Ada"), Some(2));
    }

    #[tokio::test]
    async fn delete_commit_reports_missing_rows() {
        let store = sqlite_store().await;
        let err = store.delete_commit(12345).await.expect_err("nothing to delete");
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn author_counts_accumulate_and_rank_with_name_tiebreak() {
        let store = sqlite_store().await;

        store.add_author_commits("grace", 2).await.expect("grace");
        store.add_author_commits("ada", 1).await.expect("ada");
        store.add_author_commits("ada", 1).await.expect("ada again");
        store.add_author_commits("linus", 0).await.expect("zero is a no-op");
        store.add_author_commits("barbara", 5).await.expect("barbara");

        assert_eq!(store.author_commit_count("ada").await.expect("ada"), Some(2));
        assert_eq!(store.author_commit_count("linus").await.expect("linus"), None);

        let top: Vec<_> = store
            .top_authors(3)
            .await
            .expect("top")
            .into_iter()
            .map(|row| (row.author, row.commit_count))
            .collect();
        assert_eq!(
            top,
            vec![
                ("barbara".to_string(), 5),
                ("ada".to_string(), 2),
                ("grace".to_string(), 2),
            ]
        );
    }

    #[tokio::test]
    async fn search_filters_by_name_language_and_stars() {
        let store = sqlite_store().await;
        let owner = store.upsert_user("octocat", None).await.expect("user");
        for (id, name, language, stars) in [
            (1, "rust-cli", "Rust", 10),
            (2, "rust-web", "Rust", 50),
            (3, "go-tool", "Go", 30),
        ] {
            let mut remote = remote_repo(id, "octocat", name, 0);
            remote.language = Some(language.to_string());
            remote.stars = stars;
            store.merge_repository(&owner, &remote).await.expect("merge");
        }

        let names = |repos: Vec<crate::entity::prelude::RepositoryModel>| {
            repos.into_iter().map(|r| r.name).collect::<Vec<_>>()
        };

        let by_name = store
            .search_repositories(
                owner.id,
                &RepositoryFilter {
                    name: Some("rust".to_string()),
                    ..Default::default()
                },
            )
            .await
            .expect("by name");
        assert_eq!(names(by_name), vec!["rust-cli", "rust-web"]);

        let by_language = store
            .search_repositories(
                owner.id,
                &RepositoryFilter {
                    language: Some("Go".to_string()),
                    ..Default::default()
                },
            )
            .await
            .expect("by language");
        assert_eq!(names(by_language), vec!["go-tool"]);

        let top = store
            .search_repositories(
                owner.id,
                &RepositoryFilter {
                    top_stars: Some(2),
                    ..Default::default()
                },
            )
            .await
            .expect("top stars");
        assert_eq!(names(top), vec!["rust-web", "go-tool"]);
    }

    #[tokio::test]
    async fn find_repository_requires_matching_owner() {
        let store = sqlite_store().await;
        let owner = store.upsert_user("octocat", None).await.expect("user");
        store.upsert_user("hubot", None).await.expect("other user");
        store
            .merge_repository(&owner, &remote_repo(1, "octocat", "demo", 0))
            .await
            .expect("merge");

        let found = store.find_repository("octocat", "demo").await.expect("lookup");
        assert_eq!(found.map(|t| t.full_name()).as_deref(), Some("octocat/demo"));
        assert!(store.find_repository("hubot", "demo").await.expect("lookup").is_none());
        assert!(store.find_repository("nobody", "demo").await.expect("lookup").is_none());
    }
}
