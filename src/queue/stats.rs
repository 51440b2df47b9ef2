//! Queue Statistics Module
//!
//! Tracks throughput, load shedding and execution latency of a task queue.

use std::time::Duration;

use serde::Serialize;

// == Queue Stats ==
/// Running queue counters. Advisory only.
#[derive(Debug, Clone, Default)]
pub struct QueueStats {
    /// Operations that ran to completion (success or failure)
    pub processed: u64,
    /// Tasks that missed their deadline, counted once each whether or not
    /// the caller was still waiting
    pub dropped: u64,
    /// Submissions rejected by admission control
    pub rejected: u64,
    /// Sum of execution times, for the rolling average
    total_time: Duration,
    /// Longest execution time seen
    max_time: Duration,
}

impl QueueStats {
    pub fn new() -> Self {
        Self::default()
    }

    // == Record Processed ==
    /// Records a finished operation and its execution time (queue wait excluded).
    pub fn record_processed(&mut self, elapsed: Duration) {
        self.processed += 1;
        self.total_time += elapsed;
        if elapsed > self.max_time {
            self.max_time = elapsed;
        }
    }

    pub fn record_dropped(&mut self) {
        self.dropped += 1;
    }

    pub fn record_rejected(&mut self) {
        self.rejected += 1;
    }

    // == Average Time ==
    /// Mean execution time in milliseconds, or 0.0 before the first completion.
    pub fn avg_time_ms(&self) -> f64 {
        if self.processed == 0 {
            0.0
        } else {
            self.total_time.as_secs_f64() * 1000.0 / self.processed as f64
        }
    }

    pub fn max_time_ms(&self) -> f64 {
        self.max_time.as_secs_f64() * 1000.0
    }

    // == Snapshot ==
    /// Builds the reporting snapshot given the live queue gauges.
    pub fn snapshot(&self, queue_size: usize, max_queue: usize, in_flight: usize) -> QueueStatsSnapshot {
        let utilization_percent = if max_queue == 0 {
            0.0
        } else {
            queue_size as f64 * 100.0 / max_queue as f64
        };

        QueueStatsSnapshot {
            queue_size,
            max_queue,
            in_flight,
            processed: self.processed,
            dropped: self.dropped,
            rejected: self.rejected,
            avg_time_ms: self.avg_time_ms(),
            max_time_ms: self.max_time_ms(),
            utilization_percent,
        }
    }
}

// == Snapshot ==
/// Point-in-time queue report for the status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatsSnapshot {
    pub queue_size: usize,
    pub max_queue: usize,
    pub in_flight: usize,
    pub processed: u64,
    pub dropped: u64,
    pub rejected: u64,
    pub avg_time_ms: f64,
    pub max_time_ms: f64,
    pub utilization_percent: f64,
}
