//! Remote access gateway contracts.
//!
//! [`PlatformClient`] is the single chokepoint discovery uses to reach the
//! remote forge. Implementations track the remote's rate-limit envelope in a
//! shared [`QuotaGate`], so callers never handle throttling themselves.
//!
//! # Example
//!
//! ```ignore
//! use hubmirror::platform::{CommitQuery, PlatformClient};
//!
//! async fn newest(client: &dyn PlatformClient) -> Result<(), PlatformError> {
//!     let commits = client
//!         .list_commits("rust-lang", "rust", &CommitQuery::default())
//!         .await?;
//!     println!("{} commits", commits.len());
//!     Ok(())
//! }
//! ```

mod errors;
mod rate_limit;
mod types;

pub use errors::{PlatformError, Result};
pub use rate_limit::{ApiRateLimiter, GITHUB_DEFAULT_RPS, QuotaGate};
pub use types::{CommitQuery, PlatformClient, PlatformCommit, PlatformRepo, RateLimitInfo};
