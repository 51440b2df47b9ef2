//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with insertion-time tracking.

use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;

// == Cache Entry ==
/// Represents a single cached payload and the moment it was stored.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored payload
    pub value: Value,
    /// Insertion timestamp
    pub inserted_at: Instant,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry stamped with the current time.
    pub fn new(value: Value) -> Self {
        Self {
            value,
            inserted_at: Instant::now(),
        }
    }

    // == Age ==
    /// Time elapsed since the entry was inserted.
    pub fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.inserted_at)
    }

    // == Is Fresh ==
    /// Checks if the entry is still eligible for a hit.
    ///
    /// Boundary condition: an entry whose age equals the TTL is already stale.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.age() < ttl
    }

    // == Is Expired ==
    /// Inverse of [`CacheEntry::is_fresh`].
    pub fn is_expired(&self, ttl: Duration) -> bool {
        !self.is_fresh(ttl)
    }
}
