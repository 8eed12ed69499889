//! Cache configuration.
//!
//! Runtime view of the `[cache]` settings section.

use std::time::Duration;

// Default values for cache configuration
const DEFAULT_LISTING_TTL_SECS: u64 = 20 * 60;
const DEFAULT_LOCK_TTL_SECS: u64 = 3;
const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 250;
const DEFAULT_MAX_PAGE_SIZE: u32 = 100;

/// Listing cache tunables, usually built from `config::CacheSettings`.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Serve listings through the cache. When off, every request recomputes.
    pub enabled: bool,
    /// Lifetime of a cached listing page (seconds).
    pub listing_ttl_secs: u64,
    /// Lifetime of a recomputation lock (seconds).
    pub lock_ttl_secs: u64,
    /// Upper bound for a single store round trip (ms).
    pub operation_timeout_ms: u64,
    /// Largest page size a caller may request.
    pub max_page_size: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listing_ttl_secs: DEFAULT_LISTING_TTL_SECS,
            lock_ttl_secs: DEFAULT_LOCK_TTL_SECS,
            operation_timeout_ms: DEFAULT_OPERATION_TIMEOUT_MS,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            listing_ttl_secs: settings.listing_ttl.as_secs(),
            lock_ttl_secs: settings.lock_ttl.as_secs(),
            operation_timeout_ms: u64::try_from(settings.operation_timeout.as_millis())
                .unwrap_or(u64::MAX),
            max_page_size: settings.max_page_size.get(),
        }
    }
}

impl CacheConfig {
    /// Listing ttl, clamped to at least one second.
    pub fn listing_ttl(&self) -> Duration {
        Duration::from_secs(self.listing_ttl_secs.max(1))
    }

    /// Lock ttl, clamped to at least one second.
    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_secs.max(1))
    }

    /// Operation timeout, clamped to at least one millisecond.
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms.max(1))
    }
}
