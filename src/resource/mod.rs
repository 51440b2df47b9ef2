//! Resources Module
//!
//! One queue and one cache per resource family, registered by name.

mod repository;
mod service;

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

pub use repository::{Fields, MemoryRepository, Page};
pub use service::{ResourceService, ResourceTasks};

use crate::config::Config;
use crate::error::ApiError;
use crate::models::ResourceStatus;

/// Resource families served by the API.
pub const RESOURCES: [&str; 6] = [
    "classrooms",
    "courses",
    "enrollments",
    "levels",
    "schedules",
    "teachers",
];

// == Resource Registry ==
/// Owns every [`ResourceService`] and its background tasks.
#[derive(Debug)]
pub struct ResourceRegistry {
    services: BTreeMap<String, ResourceService>,
    tasks: Mutex<Vec<ResourceTasks>>,
}

impl ResourceRegistry {
    /// Starts a service for each of [`RESOURCES`].
    pub fn start(config: &Config, repo: Arc<MemoryRepository>) -> Self {
        Self::start_with(RESOURCES, config, repo)
    }

    pub fn start_with<'a>(
        names: impl IntoIterator<Item = &'a str>,
        config: &Config,
        repo: Arc<MemoryRepository>,
    ) -> Self {
        let mut services = BTreeMap::new();
        let mut tasks = Vec::new();

        for name in names {
            let (service, handles) = ResourceService::start(name, Arc::clone(&repo), config);
            services.insert(name.to_string(), service);
            tasks.push(handles);
        }

        info!("Started {} resource services", services.len());
        Self {
            services,
            tasks: Mutex::new(tasks),
        }
    }

    /// Looks up the service for `name`.
    pub fn service(&self, name: &str) -> Result<&ResourceService, ApiError> {
        self.services
            .get(name)
            .ok_or_else(|| ApiError::NotFound(format!("Unknown resource: {}", name)))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    pub async fn statuses(&self) -> Vec<ResourceStatus> {
        let mut statuses = Vec::with_capacity(self.services.len());
        for service in self.services.values() {
            statuses.push(service.status().await);
        }
        statuses
    }

    // == Shutdown ==
    /// Stops admission on every queue, stops preloading and waits for the
    /// drain loops to finish the work already accepted.
    pub async fn shutdown(&self) {
        for service in self.services.values() {
            service.queue().shutdown();
        }

        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            task.preload.abort();
            if let Err(err) = task.drain.await {
                warn!("Drain loop ended abnormally: {}", err);
            }
        }

        info!("All resource queues drained");
    }
}
