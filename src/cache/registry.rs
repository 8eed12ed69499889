//! Invalidation index.
//!
//! Tracks, per question, every listing key whose page contains it, so that a
//! single write can evict exactly the affected pages. The mapping lives in
//! the shared store (`idx:q:<id>` sets) because any instance may have cached
//! a page and any instance may process the write.

use std::collections::BTreeSet;
use std::time::Duration;

use metrics::counter;
use tracing::{debug, info};

use crate::domain::types::QuestionId;

use super::backend::CacheClient;
use super::error::CacheError;
use super::keys::{IndexKey, ListingKey};
use super::store::PageCacheStore;

const METRIC_INVALIDATED_KEYS: &str = "exambank_listing_invalidated_keys_total";

/// Reverse mapping question id → listing keys.
///
/// Each index set is kept alive for the listing ttl after its latest
/// registration, so it never expires before a page it points to.
#[derive(Clone)]
pub struct InvalidationIndex {
    client: CacheClient,
    store: PageCacheStore,
    entry_ttl: Duration,
}

impl InvalidationIndex {
    pub fn new(client: CacheClient, store: PageCacheStore, entry_ttl: Duration) -> Self {
        Self {
            client,
            store,
            entry_ttl,
        }
    }

    /// Record that `key` contains `entity`. Re-adding a pair is a no-op.
    pub async fn add(&self, entity: QuestionId, key: &ListingKey) -> Result<(), CacheError> {
        let index_key = IndexKey::for_entity(entity);
        self.client
            .add_member(index_key.as_str(), key.as_str(), self.entry_ttl)
            .await
    }

    /// Register every entity of a freshly cached page in one batch.
    ///
    /// A failed batch may have registered part of the page; whatever was not
    /// registered stays covered by the page ttl.
    pub async fn register_page<I>(&self, key: &ListingKey, entities: I) -> Result<usize, CacheError>
    where
        I: IntoIterator<Item = QuestionId>,
    {
        let unique: BTreeSet<QuestionId> = entities.into_iter().collect();
        let index_keys: Vec<String> = unique
            .iter()
            .map(|entity| IndexKey::for_entity(*entity).as_str().to_string())
            .collect();
        self.client
            .add_to_sets(&index_keys, key.as_str(), self.entry_ttl)
            .await?;
        debug!(key = %key, entities = unique.len(), "Listing page indexed");
        Ok(unique.len())
    }

    /// Listing keys currently registered for `entity`, sorted.
    pub async fn keys_for(&self, entity: QuestionId) -> Result<Vec<ListingKey>, CacheError> {
        let index_key = IndexKey::for_entity(entity);
        let mut keys: Vec<ListingKey> = self
            .client
            .members(index_key.as_str())
            .await?
            .into_iter()
            .map(ListingKey::from_stored)
            .collect();
        keys.sort();
        Ok(keys)
    }

    /// Evict every page registered for `entity`, then forget those
    /// registrations.
    ///
    /// Only the members that were read are removed, so a page registered
    /// concurrently keeps its entry and stays evictable by the next write.
    /// Returns the number of listing keys targeted.
    pub async fn invalidate(&self, entity: QuestionId) -> Result<usize, CacheError> {
        let index_key = IndexKey::for_entity(entity);
        let members = self.client.members(index_key.as_str()).await?;
        if members.is_empty() {
            debug!(entity_id = %entity, "No cached listings reference entity");
            return Ok(0);
        }

        let keys: Vec<ListingKey> = members.iter().cloned().map(ListingKey::from_stored).collect();
        let evicted = self.store.evict(&keys).await?;
        self.client
            .remove_members(index_key.as_str(), &members)
            .await?;

        counter!(METRIC_INVALIDATED_KEYS).increment(keys.len() as u64);
        info!(
            entity_id = %entity,
            targeted = keys.len(),
            evicted,
            "Listing pages invalidated"
        );
        Ok(keys.len())
    }
}
