//! Queue Module
//!
//! Bounded async work queue with synchronous admission control, per-task
//! deadlines and batched concurrent dispatch.

mod pool;
mod stats;
mod task;

// Re-export public types
pub use pool::{QueueConfig, TaskQueue};
pub use stats::{QueueStats, QueueStatsSnapshot};
pub use task::{QueuedTask, TaskHandle};
