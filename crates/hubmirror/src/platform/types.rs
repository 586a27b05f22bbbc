use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};

use super::errors::Result;

/// Rate-limit envelope advertised by the remote on each response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// Maximum requests allowed per window.
    pub limit: usize,
    /// Requests left in the current window.
    pub remaining: usize,
    /// When the window resets.
    pub reset_at: DateTime<Utc>,
}

/// A repository as reported by the remote, independent of storage.
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformRepo {
    /// Remote numeric id. Idempotency key for merges.
    pub remote_id: i64,
    pub owner: String,
    pub name: String,
    pub description: Option<String>,
    pub html_url: String,
    pub language: Option<String>,
    pub is_fork: bool,
    pub forks: i32,
    pub stars: i32,
    pub open_issues: i32,
    pub watchers: i32,
    pub created_at: Option<DateTime<Utc>>,
    /// Sole staleness signal for re-merges.
    pub updated_at: Option<DateTime<Utc>>,
}

impl PlatformRepo {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// A commit as reported by the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformCommit {
    pub sha: String,
    pub message: String,
    pub author: String,
    pub authored_at: Option<DateTime<Utc>>,
    pub html_url: String,
}

/// Bounds for a commit listing.
///
/// `sha` is forwarded as the remote's starting revision; `since`/`until`
/// restrict the authored-date window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitQuery {
    pub sha: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl CommitQuery {
    /// A query restricted to a date window only.
    pub fn window(since: Option<DateTime<Utc>>, until: Option<DateTime<Utc>>) -> Self {
        Self {
            sha: None,
            since,
            until,
        }
    }

    #[must_use]
    pub fn starting_at(mut self, sha: impl Into<String>) -> Self {
        self.sha = Some(sha.into());
        self
    }

    /// Query-string pairs in a fixed order: `sha`, `since`, `until`.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(3);
        if let Some(sha) = &self.sha {
            params.push(("sha", sha.clone()));
        }
        if let Some(since) = self.since {
            params.push(("since", since.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        if let Some(until) = self.until {
            params.push(("until", until.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        params
    }
}

/// The three remote operations discovery relies on.
///
/// Implementations own rate-limit compliance: callers may invoke these from
/// any number of concurrent tasks and are simply suspended while the quota
/// is exhausted.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Metadata for a single repository.
    async fn get_repo(&self, owner: &str, name: &str) -> Result<PlatformRepo>;

    /// Every repository owned by `username`, all pages.
    async fn list_user_repos(&self, username: &str) -> Result<Vec<PlatformRepo>>;

    /// Commits for a repository matching `query`, all pages, newest first.
    async fn list_commits(
        &self,
        owner: &str,
        name: &str,
        query: &CommitQuery,
    ) -> Result<Vec<PlatformCommit>>;

    /// Last rate-limit envelope seen, if any response has been read yet.
    fn rate_limit(&self) -> Option<RateLimitInfo>;
}
