//! Error types for GitHub API operations.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::platform::PlatformError;

#[derive(Debug, Error)]
pub enum GitHubError {
    /// Transport failed before a response was read.
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Quota still exhausted after waiting for the reset once.
    #[error("Rate limit exceeded. Resets at {reset_at}")]
    RateLimited { reset_at: DateTime<Utc> },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<GitHubError> for PlatformError {
    fn from(err: GitHubError) -> Self {
        match err {
            GitHubError::Http(message) => PlatformError::network(message),
            GitHubError::Json(e) => PlatformError::decode(e.to_string()),
            GitHubError::Api { status, message } => PlatformError::api(status, message),
            GitHubError::RateLimited { reset_at } => PlatformError::RateLimited { reset_at },
            GitHubError::NotFound(resource) => PlatformError::not_found(resource),
            GitHubError::Config(message) => PlatformError::network(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_typed_platform_outcome() {
        let err: PlatformError = GitHubError::NotFound("octocat/missing".to_string()).into();
        assert!(err.is_not_found());
    }

    #[test]
    fn rate_limited_keeps_reset_time() {
        let reset_at = Utc::now();
        let err: PlatformError = GitHubError::RateLimited { reset_at }.into();
        match err {
            PlatformError::RateLimited { reset_at: got } => assert_eq!(got, reset_at),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn json_errors_become_decode_errors() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").expect_err("invalid json");
        let err: PlatformError = GitHubError::Json(json_err).into();
        assert!(matches!(err, PlatformError::Decode { .. }));
    }
}
