//! Advisory recomputation locks.
//!
//! A lock is a plain `SET NX PX` on the `lock:` namespace. It only narrows the
//! window in which several requests rebuild the same listing page; losing the
//! race never blocks and never fails the request. There is no release call:
//! the lock expires on its own after its ttl.

use std::time::Duration;

use metrics::counter;
use tracing::debug;
use uuid::Uuid;

use super::backend::CacheClient;
use super::error::CacheError;
use super::keys::LockKey;

const METRIC_LOCK_CONTENDED: &str = "exambank_listing_lock_contended_total";

/// Proof of having won a lock at some point in time.
///
/// Holding a handle does not mean the lock is still held; it expires after
/// its ttl regardless of what the holder is doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockHandle {
    key: LockKey,
    token: Uuid,
}

impl LockHandle {
    pub fn key(&self) -> &LockKey {
        &self.key
    }

    pub fn token(&self) -> Uuid {
        self.token
    }
}

#[derive(Clone)]
pub struct LockCoordinator {
    client: CacheClient,
}

impl LockCoordinator {
    pub fn new(client: CacheClient) -> Self {
        Self { client }
    }

    /// Try to take the lock without waiting.
    ///
    /// `Ok(None)` means somebody else holds it.
    pub async fn acquire(
        &self,
        key: &LockKey,
        ttl: Duration,
    ) -> Result<Option<LockHandle>, CacheError> {
        let token = Uuid::new_v4();
        let granted = self
            .client
            .set_nx_ex(key.as_str(), token.to_string().into_bytes(), ttl)
            .await?;

        if granted {
            debug!(lock_key = %key, %token, ttl_ms = ttl.as_millis() as u64, "Recompute lock granted");
            Ok(Some(LockHandle {
                key: key.clone(),
                token,
            }))
        } else {
            counter!(METRIC_LOCK_CONTENDED).increment(1);
            debug!(lock_key = %key, "Recompute lock held elsewhere");
            Ok(None)
        }
    }

    /// Token of the current holder, if the lock is live.
    pub async fn holder(&self, key: &LockKey) -> Result<Option<Uuid>, CacheError> {
        let Some(raw) = self.client.get(key.as_str()).await? else {
            return Ok(None);
        };
        Ok(std::str::from_utf8(&raw)
            .ok()
            .and_then(|token| Uuid::parse_str(token).ok()))
    }
}
