//! Service-layer error types.

use thiserror::Error;

use neighbourly_core::{LifecycleError, RequestError};

use crate::db::RepositoryError;

/// Errors from the lifecycle and chat services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request does not exist (or no longer exists).
    #[error("request not found")]
    NotFound,

    /// The caller lacks the relationship the operation requires.
    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    /// The request changed under the caller, or is held by someone else.
    #[error("conflict: {0}")]
    Conflict(&'static str),

    /// Malformed or missing input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound,
            other => Self::Repository(other),
        }
    }
}

impl From<LifecycleError> for ServiceError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::Forbidden(reason) => Self::Forbidden(reason),
            LifecycleError::Conflict(reason) => Self::Conflict(reason),
        }
    }
}

impl From<RequestError> for ServiceError {
    fn from(err: RequestError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}
