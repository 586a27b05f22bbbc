//! Conversion from GitHub payloads to gateway types.

use crate::platform::{PlatformCommit, PlatformRepo};

use super::types::{GitHubCommit, GitHubRepo};

/// Name recorded when a commit carries no author identity.
pub const UNKNOWN_AUTHOR: &str = "unknown";

pub fn to_platform_repo(repo: GitHubRepo) -> PlatformRepo {
    PlatformRepo {
        remote_id: repo.id,
        owner: repo.owner.login,
        name: repo.name,
        description: repo.description.filter(|d| !d.is_empty()),
        html_url: repo.html_url,
        language: repo.language,
        is_fork: repo.fork,
        forks: repo.forks_count,
        stars: repo.stargazers_count,
        open_issues: repo.open_issues_count,
        watchers: repo.watchers_count,
        created_at: repo.created_at,
        updated_at: repo.updated_at,
    }
}

pub fn to_platform_commit(commit: GitHubCommit) -> PlatformCommit {
    let (author, authored_at) = match commit.commit.author {
        Some(actor) => (actor.name, actor.date),
        None => (None, None),
    };

    PlatformCommit {
        sha: commit.sha,
        message: commit.commit.message,
        author: author
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
        authored_at,
        html_url: commit.html_url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_conversion_keeps_counts_and_timestamps() {
        let repo: GitHubRepo = serde_json::from_value(serde_json::json!({
            "id": 1296269,
            "name": "Hello-World",
            "full_name": "octocat/Hello-World",
            "owner": { "login": "octocat" },
            "html_url": "https://github.com/octocat/Hello-World",
            "description": "",
            "fork": true,
            "language": "Rust",
            "forks_count": 9,
            "stargazers_count": 80,
            "open_issues_count": 2,
            "watchers_count": 80,
            "created_at": "2011-01-26T19:01:12Z",
            "updated_at": "2011-01-26T19:14:43Z"
        }))
        .expect("valid repo json");

        let converted = to_platform_repo(repo);
        assert_eq!(converted.remote_id, 1296269);
        assert_eq!(converted.owner, "octocat");
        assert_eq!(converted.description, None);
        assert!(converted.is_fork);
        assert_eq!(converted.stars, 80);
        assert_eq!(
            converted.updated_at.map(|t| t.to_rfc3339()),
            Some("2011-01-26T19:14:43+00:00".to_string())
        );
    }

    #[test]
    fn commit_without_author_gets_placeholder_name() {
        let commit: GitHubCommit = serde_json::from_value(serde_json::json!({
            "sha": "6dcb09b5b57875f334f61aebed695e2e4193db5e",
            "html_url": "https://github.com/octocat/Hello-World/commit/6dcb09b",
            "commit": { "message": "Fix all the bugs", "author": null }
        }))
        .expect("valid commit json");

        let converted = to_platform_commit(commit);
        assert_eq!(converted.author, UNKNOWN_AUTHOR);
        assert_eq!(converted.authored_at, None);
        assert_eq!(converted.message, "Fix all the bugs");
    }
}
