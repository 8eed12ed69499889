use thiserror::Error;

use crate::application::pagination::PaginationError;
use crate::application::policy::AccessError;
use crate::application::repos::RepoError;
use crate::infra::error::InfraError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("resource not found")]
    NotFound,
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// HTTP status the request layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::Repo(RepoError::NotFound) | AppError::NotFound => 404,
            AppError::Repo(RepoError::InvalidInput { .. }) | AppError::Validation(_) => 400,
            AppError::Access(AccessError::Unauthenticated) => 401,
            AppError::Access(AccessError::Forbidden { .. }) => 403,
            AppError::Repo(RepoError::Timeout) | AppError::Repo(RepoError::Persistence(_)) => 503,
            AppError::Infra(_) | AppError::Unexpected(_) => 500,
        }
    }

    /// Message safe to show to the caller.
    pub fn presentation_message(&self) -> &'static str {
        match self {
            AppError::Repo(RepoError::NotFound) | AppError::NotFound => "Resource not found",
            AppError::Repo(RepoError::InvalidInput { .. }) | AppError::Validation(_) => {
                "Request could not be processed"
            }
            AppError::Access(AccessError::Unauthenticated) => "Authentication required",
            AppError::Access(AccessError::Forbidden { .. }) => "Access denied",
            AppError::Repo(RepoError::Timeout) | AppError::Repo(RepoError::Persistence(_)) => {
                "Service temporarily unavailable"
            }
            AppError::Infra(_) | AppError::Unexpected(_) => "Unexpected error occurred",
        }
    }
}

impl From<PaginationError> for AppError {
    fn from(err: PaginationError) -> Self {
        Self::Validation(err.to_string())
    }
}
