//! Cache Preload Task
//!
//! Background task that periodically reaps stale cache entries and
//! re-populates the preload table for known hot keys.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::cache::SharedCache;

/// Future producing the value of a hot key.
pub type LoadFuture = Pin<Box<dyn Future<Output = anyhow::Result<Value>> + Send>>;

/// Shared loader invoked once per preload attempt.
pub type Loader = Arc<dyn Fn() -> LoadFuture + Send + Sync>;

// == Hot Key ==
/// A cache key worth keeping warm, with the way to compute its value.
#[derive(Clone)]
pub struct HotKey {
    pub key: String,
    pub load: Loader,
}

impl HotKey {
    pub fn new<F, Fut>(key: impl Into<String>, load: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        Self {
            key: key.into(),
            load: Arc::new(move || Box::pin(load()) as LoadFuture),
        }
    }
}

impl std::fmt::Debug for HotKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HotKey").field("key", &self.key).finish_non_exhaustive()
    }
}

/// Spawns a background task that runs [`run_preload_cycle`] every `interval`.
///
/// The first cycle runs immediately. The returned handle can be aborted
/// during graceful shutdown.
pub fn spawn_preload_task(
    cache: SharedCache,
    hot_keys: Vec<HotKey>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Starting preload task for {} hot keys with interval of {:?}",
            hot_keys.len(),
            interval
        );

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            run_preload_cycle(&cache, &hot_keys).await;
        }
    })
}

/// Runs one preload cycle.
///
/// Purges stale entries from both tables, then loads every hot key that has
/// no fresh entry into the preload table. Loader failures are swallowed.
/// Returns the number of keys loaded.
pub async fn run_preload_cycle(cache: &SharedCache, hot_keys: &[HotKey]) -> usize {
    let (purged, missing) = {
        let mut cache_guard = cache.write().await;
        let purged = cache_guard.purge_expired();
        let missing: Vec<HotKey> = hot_keys
            .iter()
            .filter(|hot| !cache_guard.contains_fresh(&hot.key))
            .cloned()
            .collect();
        (purged, missing)
    };

    if purged > 0 {
        info!("Preload cycle: removed {} expired entries", purged);
    } else {
        debug!("Preload cycle: no expired entries found");
    }

    let mut loads = JoinSet::new();
    for hot in missing {
        loads.spawn(async move {
            let result = (hot.load)().await;
            (hot.key, result)
        });
    }

    let mut loaded = 0;
    while let Some(joined) = loads.join_next().await {
        match joined {
            Ok((key, Ok(value))) => {
                cache.write().await.preload(key, value);
                loaded += 1;
            }
            Ok((key, Err(err))) => debug!("Preload of '{}' failed: {:#}", key, err),
            Err(err) => debug!("Preload loader did not finish: {}", err),
        }
    }

    if loaded > 0 {
        debug!("Preload cycle: loaded {} hot keys", loaded);
    }
    loaded
}
