//! Enrollment Cache - queued, cached CRUD backend for school enrollment data
//!
//! Every resource family gets a bounded task queue that drains in batches and
//! a TTL response cache with preloading and pattern invalidation.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod keys;
pub mod models;
pub mod queue;
pub mod resource;
pub mod tasks;

pub use api::{create_router, AppState};
pub use config::Config;
pub use error::{ApiError, QueueError, RepoError};
pub use queue::{QueueConfig, TaskQueue};
pub use resource::{ResourceRegistry, ResourceService};
