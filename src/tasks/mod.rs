//! Background Tasks Module
//!
//! Contains the background tasks that run alongside request handling.
//!
//! # Tasks
//! - Drain loop: dispatches queued work in batches
//! - Preload: reaps stale cache entries and warms hot keys at a fixed interval
//! - Invalidation: removes cache entries matching a pattern on a later turn

mod drain;
mod invalidate;
mod preload;

pub use drain::spawn_drain_task;
pub use invalidate::spawn_invalidation;
pub use preload::{run_preload_cycle, spawn_preload_task, HotKey, LoadFuture, Loader};
