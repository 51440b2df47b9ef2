//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::queue::QueueConfig;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of pending tasks per resource queue
    pub max_queue_length: usize,
    /// Number of tasks pulled from a queue per drain iteration
    pub batch_size: usize,
    /// Default per-task deadline in milliseconds
    pub task_timeout_ms: u64,
    /// Cache entry time-to-live in milliseconds
    pub cache_ttl_ms: u64,
    /// Maximum number of entries in a primary cache table
    pub cache_max_size: usize,
    /// Interval of the hot-key preload cycle in milliseconds
    pub preload_interval_ms: u64,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_QUEUE_LENGTH` - Pending tasks per queue (default: 2000)
    /// - `BATCH_SIZE` - Tasks dispatched per drain iteration (default: 50)
    /// - `TASK_TIMEOUT_MS` - Default task deadline (default: 10000)
    /// - `CACHE_TTL_MS` - Cache entry TTL (default: 30000)
    /// - `CACHE_MAX_SIZE` - Primary cache capacity (default: 2000)
    /// - `PRELOAD_INTERVAL_MS` - Preload cycle period (default: 1000)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_queue_length: env_or("MAX_QUEUE_LENGTH", defaults.max_queue_length),
            batch_size: env_or("BATCH_SIZE", defaults.batch_size),
            task_timeout_ms: env_or("TASK_TIMEOUT_MS", defaults.task_timeout_ms),
            cache_ttl_ms: env_or("CACHE_TTL_MS", defaults.cache_ttl_ms),
            cache_max_size: env_or("CACHE_MAX_SIZE", defaults.cache_max_size),
            preload_interval_ms: env_or("PRELOAD_INTERVAL_MS", defaults.preload_interval_ms),
            server_port: env_or("SERVER_PORT", defaults.server_port),
        }
    }

    /// Queue parameters shared by every resource.
    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            max_queue_length: self.max_queue_length,
            batch_size: self.batch_size.max(1),
            default_timeout: Duration::from_millis(self.task_timeout_ms),
        }
    }

    /// Cache parameters shared by every resource.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            max_size: self.cache_max_size.max(1),
            ttl: Duration::from_millis(self.cache_ttl_ms),
        }
    }

    /// Period of the preload cycle.
    pub fn preload_interval(&self) -> Duration {
        Duration::from_millis(self.preload_interval_ms.max(1))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_queue_length: 2000,
            batch_size: 50,
            task_timeout_ms: 10_000,
            cache_ttl_ms: 30_000,
            cache_max_size: 2000,
            preload_interval_ms: 1000,
            server_port: 3000,
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
