use thiserror::Error;

use crate::application::repos::RepoError;
use crate::domain::error::DomainError;

/// Application-level error taxonomy.
///
/// Cache failures never appear here: the cache port swallows its own backend
/// errors and degrades to misses, so callers only ever see store-side or
/// domain failures.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("resource not found")]
    NotFound,
    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl AppError {
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AppError::NotFound
                | AppError::Domain(DomainError::NotFound { .. })
                | AppError::Repo(RepoError::NotFound)
        )
    }
}
