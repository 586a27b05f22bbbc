use sea_orm::DbErr;
use thiserror::Error;

/// Errors from the persistence port.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Not found: {context}")]
    NotFound { context: String },

    /// A natural-key conflict could not be reconciled.
    #[error("Conflict: {context}")]
    Conflict { context: String },
}

impl StoreError {
    pub fn not_found(context: impl Into<String>) -> Self {
        Self::NotFound {
            context: context.into(),
        }
    }

    pub fn conflict(context: impl Into<String>) -> Self {
        Self::Conflict {
            context: context.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
