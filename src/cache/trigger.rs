//! Cache trigger service.
//!
//! Write paths report committed question changes here; each change evicts
//! the listing pages that contain the question. Runs inline on the calling
//! task: there is no queue and no background consumer.

use std::sync::Arc;

use tracing::info;

use crate::domain::types::QuestionId;

use super::listing::ListingCache;

/// A committed change to a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionMutation {
    Created(QuestionId),
    Updated(QuestionId),
    Deleted(QuestionId),
}

impl QuestionMutation {
    pub fn question_id(self) -> QuestionId {
        match self {
            Self::Created(id) | Self::Updated(id) | Self::Deleted(id) => id,
        }
    }

    pub fn kind(self) -> &'static str {
        match self {
            Self::Created(_) => "created",
            Self::Updated(_) => "updated",
            Self::Deleted(_) => "deleted",
        }
    }
}

/// Entry point for write paths.
///
/// # Usage
///
/// ```ignore
/// // After a successful question update has committed:
/// trigger.question_updated(question.id).await;
/// ```
#[derive(Clone)]
pub struct CacheTrigger {
    cache: Arc<ListingCache>,
}

impl CacheTrigger {
    pub fn new(cache: Arc<ListingCache>) -> Self {
        Self { cache }
    }

    /// Invalidate the listings affected by one mutation.
    ///
    /// A created question is not yet part of any cached page, so this is
    /// usually a no-op for creations; the new question shows up in listings
    /// once the affected pages expire.
    pub async fn trigger(&self, mutation: QuestionMutation) -> usize {
        let targeted = self.cache.on_entity_mutated(mutation.question_id()).await;
        info!(
            question_id = %mutation.question_id(),
            mutation = mutation.kind(),
            targeted,
            "Question mutation processed"
        );
        targeted
    }

    /// Invalidate the listings affected by a batch of mutations.
    pub async fn trigger_all<I>(&self, mutations: I) -> usize
    where
        I: IntoIterator<Item = QuestionMutation>,
    {
        let mut targeted = 0;
        for mutation in mutations {
            targeted += self.trigger(mutation).await;
        }
        targeted
    }

    pub async fn question_created(&self, id: QuestionId) -> usize {
        self.trigger(QuestionMutation::Created(id)).await
    }

    pub async fn question_updated(&self, id: QuestionId) -> usize {
        self.trigger(QuestionMutation::Updated(id)).await
    }

    pub async fn question_deleted(&self, id: QuestionId) -> usize {
        self.trigger(QuestionMutation::Deleted(id)).await
    }

    pub fn cache(&self) -> &Arc<ListingCache> {
        &self.cache
    }
}
