//! Cache Module
//!
//! Provides an in-memory response cache with TTL expiration, bounded
//! oldest-first eviction, pattern invalidation and a preload table.

mod entry;
mod stats;
mod store;


use std::sync::Arc;

use tokio::sync::RwLock;

// Re-export public types
pub use entry::CacheEntry;
pub use stats::{CacheStats, CacheStatsSnapshot};
pub use store::{CacheConfig, TtlCache};

/// Cache handle shared between request handlers and background tasks.
pub type SharedCache = Arc<RwLock<TtlCache>>;

// == Public Constants ==
/// Maximum number of entries removed by one phase of an eviction pass
pub const EVICTION_BATCH_LIMIT: usize = 100;

/// Wraps a cache for sharing across tasks.
pub fn shared(cache: TtlCache) -> SharedCache {
    Arc::new(RwLock::new(cache))
}
