//! Listing page storage.
//!
//! One JSON document per listing key, overwritten wholesale on every refresh.
//! Index maintenance lives in `registry`; this module only touches the page
//! keys and their lock keys.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::application::pagination::Page;

use super::backend::CacheClient;
use super::error::CacheError;
use super::keys::ListingKey;

#[derive(Clone)]
pub struct PageCacheStore {
    client: CacheClient,
}

impl PageCacheStore {
    pub fn new(client: CacheClient) -> Self {
        Self { client }
    }

    /// Read a cached page.
    ///
    /// A payload that no longer decodes (older layout, truncated write) is a
    /// miss; the next `set` replaces it.
    pub async fn get<T>(&self, key: &ListingKey) -> Result<Option<Page<T>>, CacheError>
    where
        T: DeserializeOwned,
    {
        let Some(raw) = self.client.get(key.as_str()).await? else {
            return Ok(None);
        };

        match serde_json::from_slice::<Page<T>>(&raw) {
            Ok(page) => Ok(Some(page)),
            Err(err) => {
                warn!(
                    key = %key,
                    error = %err,
                    bytes = raw.len(),
                    "Discarding undecodable cached listing page"
                );
                Ok(None)
            }
        }
    }

    /// Store a page, replacing whatever was there (last writer wins).
    pub async fn set<T>(&self, key: &ListingKey, page: &Page<T>, ttl: Duration) -> Result<(), CacheError>
    where
        T: Serialize,
    {
        let payload = serde_json::to_vec(page).map_err(|source| CacheError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.client.set_ex(key.as_str(), payload, ttl).await?;
        debug!(key = %key, records = page.records.len(), ttl_secs = ttl.as_secs(), "Listing page cached");
        Ok(())
    }

    /// Drop pages together with their recomputation locks.
    ///
    /// Keys that already expired are ignored.
    pub async fn evict(&self, keys: &[ListingKey]) -> Result<u64, CacheError> {
        let doomed: Vec<String> = keys
            .iter()
            .flat_map(|key| [key.as_str().to_string(), key.lock_key().as_str().to_string()])
            .collect();
        self.client.delete(&doomed).await
    }
}
