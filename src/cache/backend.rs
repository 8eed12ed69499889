//! Store abstraction behind the listing cache.
//!
//! Production deployments talk to Redis (see `infra::redis`); tests and
//! single-node setups use [`MemoryBackend`]. Callers never use a backend
//! directly: [`CacheClient`] bounds every round trip with a timeout.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::{Instant, timeout};

use super::error::CacheError;

/// Minimal command set the cache needs from a shared key-value store.
///
/// Semantics follow Redis: expired keys behave as absent, per-key commands
/// are atomic, nothing spans keys.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// `GET key`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// `SET key value PX ttl`.
    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    /// `SET key value NX PX ttl`; true when the key was written.
    async fn set_nx_ex(&self, key: &str, value: Vec<u8>, ttl: Duration)
    -> Result<bool, CacheError>;

    /// `DEL keys...`; returns how many existed.
    async fn delete(&self, keys: &[String]) -> Result<u64, CacheError>;

    /// `SADD key member` followed by `PEXPIRE key ttl`, atomically.
    async fn add_member(&self, key: &str, member: &str, ttl: Duration) -> Result<(), CacheError>;

    /// `add_member` of one `member` into every set in `keys`, as one batch.
    ///
    /// The default sends one command per key and stops at the first error.
    /// Backends that can pipeline should override it.
    async fn add_to_sets(
        &self,
        keys: &[String],
        member: &str,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        for key in keys {
            self.add_member(key, member, ttl).await?;
        }
        Ok(())
    }

    /// `SMEMBERS key`.
    async fn members(&self, key: &str) -> Result<Vec<String>, CacheError>;

    /// `SREM key members...`; returns how many were removed.
    async fn remove_members(&self, key: &str, members: &[String]) -> Result<u64, CacheError>;
}

/// Timeout-bounded handle over a shared backend.
#[derive(Clone)]
pub struct CacheClient {
    backend: Arc<dyn CacheBackend>,
    op_timeout: Duration,
}

impl CacheClient {
    pub fn new(backend: Arc<dyn CacheBackend>, op_timeout: Duration) -> Self {
        Self {
            backend,
            op_timeout,
        }
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, CacheError>>,
    {
        match timeout(self.op_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout {
                op,
                timeout_ms: u64::try_from(self.op_timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }

    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.bounded("get", self.backend.get(key)).await
    }

    pub async fn set_ex(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        self.bounded("set", self.backend.set_ex(key, value, ttl))
            .await
    }

    pub async fn set_nx_ex(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<bool, CacheError> {
        self.bounded("set_nx", self.backend.set_nx_ex(key, value, ttl))
            .await
    }

    pub async fn delete(&self, keys: &[String]) -> Result<u64, CacheError> {
        if keys.is_empty() {
            return Ok(0);
        }
        self.bounded("del", self.backend.delete(keys)).await
    }

    pub async fn add_member(&self, key: &str, member: &str, ttl: Duration) -> Result<(), CacheError> {
        self.bounded("sadd", self.backend.add_member(key, member, ttl))
            .await
    }

    /// One bounded round trip for the whole batch, however many keys it has.
    pub async fn add_to_sets(
        &self,
        keys: &[String],
        member: &str,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        if keys.is_empty() {
            return Ok(());
        }
        self.bounded("sadd", self.backend.add_to_sets(keys, member, ttl))
            .await
    }

    pub async fn members(&self, key: &str) -> Result<Vec<String>, CacheError> {
        self.bounded("smembers", self.backend.members(key)).await
    }

    pub async fn remove_members(&self, key: &str, members: &[String]) -> Result<u64, CacheError> {
        if members.is_empty() {
            return Ok(0);
        }
        self.bounded("srem", self.backend.remove_members(key, members))
            .await
    }
}

// ============================================================================
// In-process backend
// ============================================================================

#[derive(Debug, Clone)]
enum MemoryValue {
    Bytes(Vec<u8>),
    Members(HashSet<String>),
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: MemoryValue,
    expires_at: Instant,
}

impl MemoryEntry {
    fn new(value: MemoryValue, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Single-process backend with Redis-like expiry.
///
/// Expiry is lazy: an expired entry is dropped the next time it is touched.
/// Uses the tokio clock so paused-time tests can advance past a ttl.
#[derive(Default)]
pub struct MemoryBackend {
    entries: DashMap<String, MemoryEntry>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|entry| !entry.value().is_expired(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_key(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    fn purge_expired(&self, key: &str) {
        let now = Instant::now();
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.purge_expired(key);
        match self.entries.get(key) {
            None => Ok(None),
            Some(entry) => match &entry.value {
                MemoryValue::Bytes(bytes) => Ok(Some(bytes.clone())),
                MemoryValue::Members(_) => Err(CacheError::wrong_type(key)),
            },
        }
    }

    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        self.entries.insert(
            key.to_string(),
            MemoryEntry::new(MemoryValue::Bytes(value), ttl),
        );
        Ok(())
    }

    async fn set_nx_ex(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<bool, CacheError> {
        let now = Instant::now();
        let fresh = MemoryEntry::new(MemoryValue::Bytes(value), ttl);
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired(now) {
                    occupied.insert(fresh);
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(fresh);
                Ok(true)
            }
        }
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, CacheError> {
        let now = Instant::now();
        let mut removed = 0;
        for key in keys {
            if let Some((_, entry)) = self.entries.remove(key) {
                if !entry.is_expired(now) {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    async fn add_member(&self, key: &str, member: &str, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| MemoryEntry::new(MemoryValue::Members(HashSet::new()), ttl));
        if entry.is_expired(now) {
            *entry = MemoryEntry::new(MemoryValue::Members(HashSet::new()), ttl);
        }
        match &mut entry.value {
            MemoryValue::Members(members) => {
                members.insert(member.to_string());
            }
            MemoryValue::Bytes(_) => return Err(CacheError::wrong_type(key)),
        }
        entry.expires_at = now + ttl;
        Ok(())
    }

    async fn members(&self, key: &str) -> Result<Vec<String>, CacheError> {
        self.purge_expired(key);
        match self.entries.get(key) {
            None => Ok(Vec::new()),
            Some(entry) => match &entry.value {
                MemoryValue::Members(members) => Ok(members.iter().cloned().collect()),
                MemoryValue::Bytes(_) => Err(CacheError::wrong_type(key)),
            },
        }
    }

    async fn remove_members(&self, key: &str, members: &[String]) -> Result<u64, CacheError> {
        self.purge_expired(key);
        let (removed, now_empty) = match self.entries.get_mut(key) {
            None => return Ok(0),
            Some(mut entry) => match &mut entry.value {
                MemoryValue::Members(set) => {
                    let removed = members.iter().filter(|m| set.remove(m.as_str())).count();
                    (removed as u64, set.is_empty())
                }
                MemoryValue::Bytes(_) => return Err(CacheError::wrong_type(key)),
            },
        };
        // Redis drops a set once its last member is removed.
        if now_empty {
            self.entries.remove_if(key, |_, entry| {
                matches!(&entry.value, MemoryValue::Members(set) if set.is_empty())
            });
        }
        Ok(removed)
    }
}
