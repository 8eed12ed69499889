//! Question listing service.
//!
//! Validates the caller's request, picks the listing scope from the request
//! context and serves pages through the shared listing cache. Write paths
//! report committed mutations through [`QuestionListingService::question_mutated`].

use std::sync::Arc;

use tracing::instrument;

use crate::application::error::AppError;
use crate::application::pagination::{Page, PageRequest};
use crate::application::policy::{self, Method};
use crate::application::repos::{ListingQuery, QuestionCatalog};
use crate::cache::{CacheTrigger, ListingCache, ListingParams, QuestionMutation};
use crate::domain::context::RequestContext;
use crate::domain::question::QuestionSummary;
use crate::domain::types::SubjectId;

const LISTING_ROUTE: &str = "/api/questions";

/// Raw listing parameters as received from the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListRequest {
    pub page: u32,
    pub size: u32,
    pub subject: Option<SubjectId>,
}

#[derive(Clone)]
pub struct QuestionListingService {
    catalog: Arc<dyn QuestionCatalog>,
    cache: Arc<ListingCache>,
    trigger: CacheTrigger,
}

impl QuestionListingService {
    pub fn new(catalog: Arc<dyn QuestionCatalog>, cache: Arc<ListingCache>) -> Self {
        let trigger = CacheTrigger::new(cache.clone());
        Self {
            catalog,
            cache,
            trigger,
        }
    }

    pub fn cache(&self) -> &Arc<ListingCache> {
        &self.cache
    }

    #[instrument(skip(self), fields(role = %ctx.role()))]
    pub async fn list(
        &self,
        ctx: &RequestContext,
        request: ListRequest,
    ) -> Result<Page<QuestionSummary>, AppError> {
        policy::authorize(ctx, Method::Get, LISTING_ROUTE)?;

        let page_request = PageRequest::new(
            request.page,
            request.size,
            self.cache.config().max_page_size,
        )?;
        let params = ListingParams::for_context(
            ctx,
            page_request.page(),
            page_request.size(),
            request.subject,
        );
        let query = ListingQuery {
            request: page_request,
            subject: request.subject,
            viewer: params.viewer(),
        };

        let catalog = Arc::clone(&self.catalog);
        let page = self
            .cache
            .fetch_or_compute(&params, || async move { catalog.list_questions(&query).await })
            .await?;
        Ok(page)
    }

    /// Evict cached listings after a committed write. Returns the number of
    /// listing keys targeted.
    pub async fn question_mutated(&self, mutation: QuestionMutation) -> usize {
        self.trigger.trigger(mutation).await
    }
}
