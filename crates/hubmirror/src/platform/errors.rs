use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors surfaced by the remote access gateway.
///
/// Discovery only needs to tell three situations apart: the remote entity
/// does not exist ([`PlatformError::NotFound`]), the remote is temporarily
/// unusable (everything [`PlatformError::is_transient`] accepts), or the
/// remote answered with something unexpected.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The remote entity does not exist.
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// Quota is still exhausted after the single retry.
    #[error("Rate limit exceeded. Resets at {reset_at}")]
    RateLimited { reset_at: DateTime<Utc> },

    /// Connection-level failure before a response was read.
    #[error("Network error: {message}")]
    Network { message: String },

    /// Non-success status other than 404.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The response body did not have the expected shape.
    #[error("Decode error: {message}")]
    Decode { message: String },
}

impl PlatformError {
    #[inline]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    #[inline]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    #[inline]
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    #[inline]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    #[inline]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Network, decoding and quota failures. Worth trying again later.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Decode { .. } | Self::RateLimited { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            Self::NotFound { .. } => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, PlatformError>;
