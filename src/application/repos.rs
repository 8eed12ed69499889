//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::application::pagination::{Page, PageRequest};
use crate::domain::question::QuestionSummary;
use crate::domain::types::{SubjectId, UserId};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("database timeout")]
    Timeout,
}

/// Query handed to the backing store on a cache miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingQuery {
    pub request: PageRequest,
    pub subject: Option<SubjectId>,
    /// `None` lists system questions only; `Some(user)` adds the user's own.
    pub viewer: Option<UserId>,
}

/// Source of truth for question listings.
#[async_trait]
pub trait QuestionCatalog: Send + Sync {
    async fn list_questions(
        &self,
        query: &ListingQuery,
    ) -> Result<Page<QuestionSummary>, RepoError>;
}
