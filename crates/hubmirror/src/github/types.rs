//! GitHub REST payloads, reduced to the fields the mirror stores.

use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubOwner {
    pub login: String,
}

/// `GET /repos/{owner}/{repo}` and the items of `GET /users/{user}/repos`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRepo {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub full_name: Option<String>,
    pub owner: GitHubOwner,
    pub html_url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub forks_count: i32,
    #[serde(default)]
    pub stargazers_count: i32,
    #[serde(default)]
    pub open_issues_count: i32,
    #[serde(default)]
    pub watchers_count: i32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubGitActor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubCommitDetail {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub author: Option<GitHubGitActor>,
}

/// Items of `GET /repos/{owner}/{repo}/commits`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubCommit {
    pub sha: String,
    pub html_url: String,
    pub commit: GitHubCommitDetail,
}

/// Error body GitHub returns alongside non-2xx statuses.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GitHubErrorBody {
    pub message: String,
}
