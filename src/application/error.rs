//! Application-level error taxonomy.
//!
//! `NotFound` and `Conflict` are expected, user-facing outcomes. Store
//! failures always propagate; cache failures never reach this layer (the
//! cache modules degrade and log instead).

use thiserror::Error;

use crate::application::repos::RepoError;
use crate::infra::error::InfraError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("invalid credentials")]
    Unauthorized,
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Store(RepoError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => Self::NotFound("resource not found".to_string()),
            RepoError::Duplicate { constraint } => {
                Self::Conflict(format!("duplicate record violates `{constraint}`"))
            }
            RepoError::InvalidInput { message } => Self::Validation(message),
            other => Self::Store(other),
        }
    }
}

impl From<InfraError> for AppError {
    fn from(err: InfraError) -> Self {
        Self::Unexpected(err.to_string())
    }
}
