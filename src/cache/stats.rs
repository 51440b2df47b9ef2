//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, and evictions.

use serde::Serialize;

// == Cache Stats ==
/// Running cache counters. Advisory only.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Number of lookups answered from either table
    pub hits: u64,
    /// Number of lookups that found nothing fresh
    pub misses: u64,
    /// Number of entries removed by capacity eviction
    pub evictions: u64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Hit rate as a percentage, or 0.0 if no lookups have been made.
    pub fn hit_rate_percent(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 * 100.0 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_evictions(&mut self, count: usize) {
        self.evictions += count as u64;
    }

    // == Snapshot ==
    /// Builds the reporting snapshot given the current table sizes.
    pub fn snapshot(&self, size: usize, preload_size: usize) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            size,
            preload_size,
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            hit_rate_percent: self.hit_rate_percent(),
        }
    }
}

// == Snapshot ==
/// Point-in-time cache report for the status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatsSnapshot {
    pub size: usize,
    pub preload_size: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub hit_rate_percent: f64,
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.evictions, 0);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let stats = CacheStats::new();
        assert_eq!(stats.hit_rate_percent(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        assert_eq!(stats.hit_rate_percent(), 75.0);
    }

    #[test]
    fn test_record_evictions() {
        let mut stats = CacheStats::new();
        stats.record_evictions(3);
        stats.record_evictions(0);
        assert_eq!(stats.evictions, 3);
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        let json = serde_json::to_value(stats.snapshot(4, 1)).unwrap();

        assert_eq!(json["size"], 4);
        assert_eq!(json["preloadSize"], 1);
        assert_eq!(json["hitRatePercent"], 100.0);
    }
}
