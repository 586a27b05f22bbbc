use thiserror::Error;

use crate::platform::PlatformError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("User not found: {username}")]
    UserNotFound { username: String },

    #[error("Repository not found locally: {owner}/{name}")]
    RepositoryNotFound { owner: String, name: String },
}

impl DiscoveryError {
    pub fn repository_not_found(owner: &str, name: &str) -> Self {
        Self::RepositoryNotFound {
            owner: owner.to_string(),
            name: name.to_string(),
        }
    }

    /// Remote or local absence. Expected, not worth an error-level log.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Platform(e) => e.is_not_found(),
            Self::UserNotFound { .. } | Self::RepositoryNotFound { .. } => true,
            Self::Store(StoreError::NotFound { .. }) => true,
            Self::Store(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, DiscoveryError>;
