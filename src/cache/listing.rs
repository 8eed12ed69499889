//! Cache-aside orchestration for question listings.
//!
//! ```text
//! get(key) ── hit ──────────────────────────────────────────▶ page
//!    │
//!   miss ─▶ acquire(lock:key) ─▶ compute ─▶ set(key) ─▶ index ─▶ page
//!    │       (outcome ignored)
//!  error ─────────────────────▶ compute ─────────────────────▶ page
//! ```
//!
//! Nothing in here turns a store failure into a request failure: the only
//! error a caller can see is the one returned by its own `compute`.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::application::pagination::Page;
use crate::domain::question::CacheableRecord;
use crate::domain::types::QuestionId;

use super::backend::{CacheBackend, CacheClient};
use super::config::CacheConfig;
use super::error::CacheError;
use super::keys::{ListingKey, ListingParams};
use super::lock::LockCoordinator;
use super::registry::InvalidationIndex;
use super::store::PageCacheStore;

const METRIC_HIT: &str = "exambank_listing_cache_hit_total";
const METRIC_MISS: &str = "exambank_listing_cache_miss_total";
const METRIC_FAIL_OPEN: &str = "exambank_listing_cache_fail_open_total";
const METRIC_COMPUTE_MS: &str = "exambank_listing_compute_ms";

/// Entry point used by listing services and write paths.
#[derive(Clone)]
pub struct ListingCache {
    config: CacheConfig,
    store: PageCacheStore,
    locks: LockCoordinator,
    index: InvalidationIndex,
}

impl ListingCache {
    pub fn new(config: CacheConfig, backend: Arc<dyn CacheBackend>) -> Self {
        let client = CacheClient::new(backend, config.operation_timeout());
        let store = PageCacheStore::new(client.clone());
        let locks = LockCoordinator::new(client.clone());
        let index = InvalidationIndex::new(client, store.clone(), config.listing_ttl());
        Self {
            config,
            store,
            locks,
            index,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn store(&self) -> &PageCacheStore {
        &self.store
    }

    pub fn locks(&self) -> &LockCoordinator {
        &self.locks
    }

    pub fn index(&self) -> &InvalidationIndex {
        &self.index
    }

    /// Serve `params` from the cache, or run `compute` and cache its result.
    #[instrument(skip_all, fields(key = tracing::field::Empty))]
    pub async fn fetch_or_compute<T, E, F, Fut>(
        &self,
        params: &ListingParams,
        compute: F,
    ) -> Result<Page<T>, E>
    where
        T: Serialize + DeserializeOwned + CacheableRecord,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Page<T>, E>>,
    {
        if !self.config.enabled {
            return compute().await;
        }

        let key = params.key();
        tracing::Span::current().record("key", key.as_str());

        match self.store.get::<T>(&key).await {
            Ok(Some(page)) if page.current == params.page && page.size == params.size => {
                counter!(METRIC_HIT).increment(1);
                debug!("Listing cache hit");
                return Ok(page);
            }
            Ok(Some(page)) => {
                counter!(METRIC_MISS).increment(1);
                warn!(
                    cached_page = page.current,
                    cached_size = page.size,
                    "Cached listing page does not match its key; recomputing"
                );
            }
            Ok(None) => {
                counter!(METRIC_MISS).increment(1);
                debug!("Listing cache miss");
            }
            Err(err) => {
                record_fail_open("get", &key, &err);
                return timed_compute(compute).await;
            }
        }

        match self
            .locks
            .acquire(&key.lock_key(), self.config.lock_ttl())
            .await
        {
            Ok(Some(_)) => {}
            Ok(None) => debug!("Another instance is recomputing this page; recomputing anyway"),
            Err(err) => record_fail_open("lock", &key, &err),
        }

        let page = timed_compute(compute).await?;
        self.populate(&key, &page).await;
        Ok(page)
    }

    async fn populate<T>(&self, key: &ListingKey, page: &Page<T>)
    where
        T: Serialize + CacheableRecord,
    {
        if let Err(err) = self
            .store
            .set(key, page, self.config.listing_ttl())
            .await
        {
            // Never index a key whose page is not stored.
            record_fail_open("set", key, &err);
            return;
        }

        if let Err(err) = self.index.register_page(key, page.entity_ids()).await {
            record_fail_open("index", key, &err);
        }
    }

    /// Evict every cached page that contains `entity`.
    ///
    /// Called by write paths after a create, update or delete has committed.
    /// Returns the number of listing keys targeted; store failures count as
    /// zero and leave the pages to expire on their own.
    #[instrument(skip_all, fields(entity_id = %entity))]
    pub async fn on_entity_mutated(&self, entity: QuestionId) -> usize {
        match self.index.invalidate(entity).await {
            Ok(targeted) => targeted,
            Err(err) => {
                warn!(
                    error = %err,
                    hint = "affected pages stay stale until their ttl elapses",
                    "Listing invalidation failed"
                );
                counter!(METRIC_FAIL_OPEN, "op" => "invalidate").increment(1);
                0
            }
        }
    }
}

async fn timed_compute<T, E, F, Fut>(compute: F) -> Result<Page<T>, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
{
    let started_at = Instant::now();
    let result = compute().await;
    histogram!(METRIC_COMPUTE_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);
    result
}

fn record_fail_open(op: &'static str, key: &ListingKey, err: &CacheError) {
    warn!(
        op,
        key = %key,
        error = %err,
        "Listing cache unavailable; serving from backing store"
    );
    counter!(METRIC_FAIL_OPEN, "op" => op).increment(1);
}
