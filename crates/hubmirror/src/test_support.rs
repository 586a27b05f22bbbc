//! Fixtures shared by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::platform::{
    self, CommitQuery, PlatformClient, PlatformCommit, PlatformError, PlatformRepo, RateLimitInfo,
};

pub(crate) fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// A remote repository whose `updated_at` is `updated_day` days after the base time.
pub(crate) fn remote_repo(
    remote_id: i64,
    owner: &str,
    name: &str,
    updated_day: i64,
) -> PlatformRepo {
    PlatformRepo {
        remote_id,
        owner: owner.to_string(),
        name: name.to_string(),
        description: Some(format!("{name} description")),
        html_url: format!("https://github.com/{owner}/{name}"),
        language: Some("Rust".to_string()),
        is_fork: false,
        forks: 1,
        stars: 2,
        open_issues: 0,
        watchers: 2,
        created_at: Some(base_time()),
        updated_at: Some(base_time() + Duration::days(updated_day)),
    }
}

pub(crate) fn commit(sha: &str, author: &str) -> PlatformCommit {
    PlatformCommit {
        sha: sha.to_string(),
        message: format!("commit {sha}"),
        author: author.to_string(),
        authored_at: Some(base_time()),
        html_url: format!("https://github.com/o/r/commit/{sha}"),
    }
}

#[cfg(all(feature = "sqlite", feature = "migrate"))]
pub(crate) async fn sqlite_store() -> crate::store::SqlStore {
    let db = crate::db::connect_and_migrate("sqlite::memory:")
        .await
        .expect("in-memory database should migrate");
    crate::store::SqlStore::new(db)
}

#[derive(Default)]
struct FakeState {
    repos: HashMap<(String, String), PlatformRepo>,
    user_repos: HashMap<String, Vec<PlatformRepo>>,
    commits: HashMap<(String, String), Vec<PlatformCommit>>,
    failing: HashSet<String>,
    calls: Vec<String>,
    commit_queries: Vec<(String, CommitQuery)>,
}

/// In-memory remote with scripted repositories and commit histories.
#[derive(Default)]
pub(crate) struct FakePlatform {
    state: Mutex<FakeState>,
}

impl FakePlatform {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake platform lock")
    }

    /// Register `repo` both for point lookups and in its owner's listing.
    pub(crate) fn add_repo(&self, repo: PlatformRepo) {
        let mut state = self.state();
        let key = (repo.owner.clone(), repo.name.clone());
        let listing = state.user_repos.entry(repo.owner.clone()).or_default();
        listing.retain(|r| r.remote_id != repo.remote_id);
        listing.push(repo.clone());
        state.repos.insert(key, repo);
    }

    /// Replace the commit history of `owner/name`, newest first.
    pub(crate) fn set_commits(&self, owner: &str, name: &str, commits: Vec<PlatformCommit>) {
        self.state()
            .commits
            .insert((owner.to_string(), name.to_string()), commits);
    }

    /// Make every call touching `resource` (`owner/name` or a username) fail.
    pub(crate) fn fail(&self, resource: &str) {
        self.state().failing.insert(resource.to_string());
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub(crate) fn commit_queries(&self) -> Vec<(String, CommitQuery)> {
        self.state().commit_queries.clone()
    }
}

#[async_trait]
impl PlatformClient for FakePlatform {
    async fn get_repo(&self, owner: &str, name: &str) -> platform::Result<PlatformRepo> {
        let resource = format!("{owner}/{name}");
        let mut state = self.state();
        state.calls.push(format!("get_repo {resource}"));
        if state.failing.contains(&resource) {
            return Err(PlatformError::network("scripted failure"));
        }
        state
            .repos
            .get(&(owner.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| PlatformError::not_found(resource))
    }

    async fn list_user_repos(&self, username: &str) -> platform::Result<Vec<PlatformRepo>> {
        let mut state = self.state();
        state.calls.push(format!("list_user_repos {username}"));
        if state.failing.contains(username) {
            return Err(PlatformError::network("scripted failure"));
        }
        Ok(state.user_repos.get(username).cloned().unwrap_or_default())
    }

    async fn list_commits(
        &self,
        owner: &str,
        name: &str,
        query: &CommitQuery,
    ) -> platform::Result<Vec<PlatformCommit>> {
        let resource = format!("{owner}/{name}");
        let mut state = self.state();
        state.calls.push(format!("list_commits {resource}"));
        state.commit_queries.push((resource.clone(), query.clone()));
        if state.failing.contains(&resource) {
            return Err(PlatformError::network("scripted failure"));
        }
        Ok(state
            .commits
            .get(&(owner.to_string(), name.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn rate_limit(&self) -> Option<RateLimitInfo> {
        None
    }
}
