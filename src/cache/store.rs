//! TTL Cache Module
//!
//! Primary table with lazy expiry and bounded eviction, plus a secondary
//! preload table for speculatively populated hot keys.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, CacheStatsSnapshot, EVICTION_BATCH_LIMIT};

/// Capacity and freshness parameters of a [`TtlCache`].
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries in the primary table
    pub max_size: usize,
    /// Maximum age of an entry eligible for a hit
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 2000,
            ttl: Duration::from_secs(30),
        }
    }
}

// == TTL Cache ==
/// Response cache keyed by request shape.
#[derive(Debug)]
pub struct TtlCache {
    /// Primary table
    entries: HashMap<String, CacheEntry>,
    /// Speculatively loaded entries, consulted on primary miss
    preloaded: HashMap<String, CacheEntry>,
    /// Performance statistics
    stats: CacheStats,
    max_size: usize,
    ttl: Duration,
}

impl TtlCache {
    // == Constructor ==
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: HashMap::new(),
            preloaded: HashMap::new(),
            stats: CacheStats::new(),
            max_size: config.max_size.max(1),
            ttl: config.ttl,
        }
    }

    // == Get ==
    /// Looks up a fresh value.
    ///
    /// Falls back to the preload table on primary miss and promotes what it
    /// finds there. Stale entries are left in place.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        if let Some(entry) = self.entries.get(key) {
            if entry.is_fresh(self.ttl) {
                self.stats.record_hit();
                return Some(entry.value.clone());
            }
        }

        let preload_fresh = self
            .preloaded
            .get(key)
            .is_some_and(|entry| entry.is_fresh(self.ttl));

        if preload_fresh {
            if let Some(entry) = self.preloaded.remove(key) {
                let value = entry.value.clone();
                self.stats.record_hit();
                // keeps the original insertion time
                self.insert_entry(key.to_string(), entry);
                return Some(value);
            }
        }

        self.stats.record_miss();
        None
    }

    // == Set ==
    /// Stores a value in the primary table, overwriting in place.
    ///
    /// Inserting a new key into a full table triggers a bounded eviction
    /// pass first, so the table never exceeds `max_size`.
    pub fn set(&mut self, key: String, value: Value) {
        self.insert_entry(key, CacheEntry::new(value));
    }

    // == Preload ==
    /// Stores a value in the preload table.
    pub fn preload(&mut self, key: String, value: Value) {
        self.preloaded.insert(key, CacheEntry::new(value));
    }

    // == Contains Fresh ==
    /// True if either table holds a fresh entry for `key`. Does not touch stats.
    pub fn contains_fresh(&self, key: &str) -> bool {
        let fresh = |entry: &CacheEntry| entry.is_fresh(self.ttl);
        self.entries.get(key).is_some_and(fresh) || self.preloaded.get(key).is_some_and(fresh)
    }

    // == Invalidate ==
    /// Removes every key containing `pattern` from both tables.
    ///
    /// Returns the number of entries removed.
    pub fn invalidate(&mut self, pattern: &str) -> usize {
        let before = self.entries.len() + self.preloaded.len();
        self.entries.retain(|key, _| !key.contains(pattern));
        self.preloaded.retain(|key, _| !key.contains(pattern));
        before - (self.entries.len() + self.preloaded.len())
    }

    // == Purge Expired ==
    /// Removes all stale entries from both tables.
    pub fn purge_expired(&mut self) -> usize {
        let ttl = self.ttl;
        let before = self.entries.len() + self.preloaded.len();
        self.entries.retain(|_, entry| entry.is_fresh(ttl));
        self.preloaded.retain(|_, entry| entry.is_fresh(ttl));
        before - (self.entries.len() + self.preloaded.len())
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot(self.entries.len(), self.preloaded.len())
    }

    /// Number of entries in the primary table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries in the preload table.
    pub fn preload_len(&self) -> usize {
        self.preloaded.len()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    fn insert_entry(&mut self, key: String, entry: CacheEntry) {
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_size {
            self.evict();
        }
        self.entries.insert(key, entry);
    }

    // == Evict ==
    /// Makes room for one new entry.
    ///
    /// Drops stale entries first, then the oldest by insertion time. Each
    /// phase removes at most [`EVICTION_BATCH_LIMIT`] entries.
    fn evict(&mut self) {
        let ttl = self.ttl;
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(ttl))
            .map(|(key, _)| key.clone())
            .take(EVICTION_BATCH_LIMIT)
            .collect();
        for key in &expired {
            self.entries.remove(key);
        }

        let mut removed = expired.len();

        if self.entries.len() >= self.max_size {
            let excess = (self.entries.len() + 1 - self.max_size).min(EVICTION_BATCH_LIMIT);
            let mut by_age: Vec<(&String, &CacheEntry)> = self.entries.iter().collect();
            by_age.sort_by_key(|(_, entry)| entry.inserted_at);
            let oldest: Vec<String> = by_age
                .into_iter()
                .take(excess)
                .map(|(key, _)| key.clone())
                .collect();
            for key in &oldest {
                self.entries.remove(key);
            }
            removed += oldest.len();
        }

        self.stats.record_evictions(removed);
        debug!("Cache eviction removed {} entries", removed);
    }
}
