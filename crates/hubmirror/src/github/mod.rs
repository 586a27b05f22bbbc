//! GitHub implementation of the remote access gateway.
//!
//! # Module Structure
//!
//! - [`client`] - [`GitHubClient`], quota-gated requests and pagination
//! - [`types`] - REST payloads
//! - [`convert`] - payload to [`crate::platform`] conversion
//! - [`error`] - [`GitHubError`] and its mapping to [`crate::platform::PlatformError`]

mod client;
mod convert;
mod error;
mod types;

pub use client::{DEFAULT_API_URL, GitHubClient, PAGE_SIZE};
pub use convert::{UNKNOWN_AUTHOR, to_platform_commit, to_platform_repo};
pub use error::GitHubError;
pub use types::{GitHubCommit, GitHubCommitDetail, GitHubGitActor, GitHubOwner, GitHubRepo};
