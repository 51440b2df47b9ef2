//! Deferred Cache Invalidation
//!
//! Runs pattern invalidation on its own task so the writer never scans the
//! cache tables inside its own call stack.

use tokio::task::JoinHandle;
use tracing::debug;

use crate::cache::SharedCache;

/// Schedules removal of every cache key containing `pattern`.
///
/// The scan runs on a later scheduling turn. The handle resolves to the
/// number of entries removed.
pub fn spawn_invalidation(cache: SharedCache, pattern: impl Into<String>) -> JoinHandle<usize> {
    let pattern = pattern.into();

    tokio::spawn(async move {
        let removed = cache.write().await.invalidate(&pattern);
        debug!("Invalidated {} cache entries matching '{}'", removed, pattern);
        removed
    })
}
