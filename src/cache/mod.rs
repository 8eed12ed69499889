//! Exambank Listing Cache
//!
//! Cache-aside layer for paginated question listings, shared by every
//! instance through one remote store:
//!
//! - **keys**: canonical listing, lock and index keys
//! - **lock**: advisory, non-blocking recomputation locks
//! - **store**: one serialized page per listing key, with a ttl
//! - **registry**: question id → listing keys, for targeted invalidation
//! - **listing**: fetch-or-compute and mutation entry points
//!
//! ## Configuration
//!
//! Cache behavior is controlled via `exambank.toml`:
//!
//! ```toml
//! [cache]
//! enabled = true
//! listing_ttl_seconds = 1200
//! lock_ttl_seconds = 3
//! operation_timeout_ms = 250
//! max_page_size = 100
//! ```

pub mod backend;
mod config;
mod error;
mod keys;
mod listing;
mod lock;
mod registry;
mod store;
mod trigger;

pub use backend::{CacheBackend, CacheClient, MemoryBackend};
pub use config::CacheConfig;
pub use error::CacheError;
pub use keys::{IndexKey, ListingKey, ListingParams, ListingScope, LockKey};
pub use listing::ListingCache;
pub use lock::{LockCoordinator, LockHandle};
pub use registry::InvalidationIndex;
pub use store::PageCacheStore;
pub use trigger::{CacheTrigger, QuestionMutation};
