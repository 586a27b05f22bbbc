//! Hubmirror - a background mirror of GitHub users, repositories and commits.
//!
//! Registered users are backfilled repository by repository, stored
//! repositories are rescanned periodically, and reads are served from the
//! local database. All remote traffic goes through one quota-aware gateway.
//!
//! # Features
//!
//! - `github` - the GitHub REST client ([`github::GitHubClient`]).
//! - `migrate` - schema migrations and [`connect_and_migrate`].
//! - `sqlite` / `postgres` - database drivers.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use hubmirror::{discovery, store::SqlStore, tasks::{TaskManager, TaskOptions, TaskQueue}};
//!
//! let store = Arc::new(SqlStore::new(hubmirror::connect_and_migrate(url).await?));
//! let client = Arc::new(hubmirror::github::GitHubClient::new(
//!     hubmirror::github::DEFAULT_API_URL,
//!     token,
//!     None,
//! )?);
//! let options = discovery::DiscoveryOptions::default();
//! let commits = Arc::new(discovery::CommitDiscoveryService::new(
//!     client.clone(),
//!     store.clone(),
//!     options.clone(),
//! ));
//! let repos = Arc::new(discovery::RepositoryDiscoveryService::new(
//!     client,
//!     store,
//!     commits.clone(),
//!     options,
//! ));
//!
//! let tasks = TaskManager::start(repos, commits, TaskOptions::default());
//! tasks.enqueue_rescan()?;
//! // ...
//! tasks.shutdown().await?;
//! ```

pub mod db;
pub mod discovery;
pub mod entity;
pub mod http;
pub mod platform;
pub mod service;
pub mod store;
pub mod tasks;

#[cfg(feature = "github")]
pub mod github;

#[cfg(feature = "migrate")]
pub mod migration;

#[cfg(test)]
pub(crate) mod test_support;

pub use db::connect;
#[cfg(feature = "migrate")]
pub use db::connect_and_migrate;
pub use entity::prelude::*;
pub use platform::{PlatformClient, PlatformError, QuotaGate, RateLimitInfo};
pub use service::{MirrorService, ServiceError};
pub use store::{SqlStore, Store, StoreError};
pub use tasks::{TaskManager, TaskOptions, TaskQueue};
