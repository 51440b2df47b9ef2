//! Resource Service
//!
//! Pairs one task queue with one cache for a single resource family and
//! implements read-through reads and invalidating writes on top of the
//! repository.

use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cache::{self, SharedCache, TtlCache};
use crate::config::Config;
use crate::error::{QueueError, RepoError};
use crate::keys::{self, ListQuery};
use crate::models::ResourceStatus;
use crate::queue::TaskQueue;
use crate::resource::{Fields, MemoryRepository};
use crate::tasks::{spawn_invalidation, spawn_preload_task, HotKey};

type ServiceResult<T> = Result<T, QueueError<RepoError>>;

/// Background tasks owned by one resource.
#[derive(Debug)]
pub struct ResourceTasks {
    pub drain: JoinHandle<()>,
    pub preload: JoinHandle<()>,
}

// == Resource Service ==
#[derive(Clone)]
pub struct ResourceService {
    name: Arc<str>,
    queue: TaskQueue,
    cache: SharedCache,
    repo: Arc<MemoryRepository>,
}

impl ResourceService {
    /// Builds the queue and cache for `name` and spawns the drain loop and
    /// the preload cycle. The first page of the default listing is kept warm.
    pub fn start(
        name: &str,
        repo: Arc<MemoryRepository>,
        config: &Config,
    ) -> (Self, ResourceTasks) {
        let (queue, drain) = TaskQueue::start(name, config.queue_config());
        let cache = cache::shared(TtlCache::new(config.cache_config()));

        let service = Self {
            name: Arc::from(name),
            queue,
            cache,
            repo,
        };

        let preload = spawn_preload_task(
            service.cache.clone(),
            vec![service.default_listing_hot_key()],
            config.preload_interval(),
        );

        (service, ResourceTasks { drain, preload })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    // == Reads ==
    /// Returns a page of records, served from cache when fresh.
    pub async fn list(&self, query: ListQuery) -> ServiceResult<Value> {
        let key = keys::list_key(&self.name, &query);
        if let Some(hit) = self.cache.write().await.get(&key) {
            debug!("Cache hit for '{}'", key);
            return Ok(hit);
        }

        let value = fetch_page(&self.queue, &self.repo, &self.name, query).await?;
        self.cache.write().await.set(key, value.clone());
        Ok(value)
    }

    /// Returns one record, served from cache when fresh.
    pub async fn get(&self, id: u64) -> ServiceResult<Value> {
        let key = keys::item_key(&self.name, id);
        if let Some(hit) = self.cache.write().await.get(&key) {
            debug!("Cache hit for '{}'", key);
            return Ok(hit);
        }

        let repo = Arc::clone(&self.repo);
        let name = Arc::clone(&self.name);
        let value = self
            .queue
            .submit(move || async move { repo.get(&name, id).await })?
            .await?;

        self.cache.write().await.set(key, value.clone());
        Ok(value)
    }

    // == Writes ==
    pub async fn create(&self, fields: Fields) -> ServiceResult<Value> {
        let repo = Arc::clone(&self.repo);
        let name = Arc::clone(&self.name);
        let created = self
            .queue
            .submit(move || async move { repo.create(&name, fields).await })?
            .await?;

        self.invalidate().await;
        Ok(created)
    }

    pub async fn update(&self, id: u64, fields: Fields) -> ServiceResult<Value> {
        let repo = Arc::clone(&self.repo);
        let name = Arc::clone(&self.name);
        let updated = self
            .queue
            .submit(move || async move { repo.update(&name, id, fields).await })?
            .await?;

        self.invalidate().await;
        Ok(updated)
    }

    pub async fn delete(&self, id: u64) -> ServiceResult<()> {
        let repo = Arc::clone(&self.repo);
        let name = Arc::clone(&self.name);
        self.queue
            .submit(move || async move { repo.delete(&name, id).await })?
            .await?;

        self.invalidate().await;
        Ok(())
    }

    // == Status ==
    pub async fn status(&self) -> ResourceStatus {
        ResourceStatus {
            resource: self.name.to_string(),
            queue: self.queue.stats(),
            cache: self.cache.read().await.stats(),
        }
    }

    /// Drops every cached response of this resource family.
    ///
    /// Runs on a separate task; the caller waits for it so its own next read
    /// cannot observe pre-write data.
    async fn invalidate(&self) {
        let pattern = keys::resource_pattern(&self.name);
        if let Err(err) = spawn_invalidation(self.cache.clone(), pattern).await {
            warn!("Invalidation for '{}' did not complete: {}", self.name, err);
        }
    }

    fn default_listing_hot_key(&self) -> HotKey {
        let query = ListQuery::default();
        let key = keys::list_key(&self.name, &query);
        let queue = self.queue.clone();
        let repo = Arc::clone(&self.repo);
        let name = Arc::clone(&self.name);

        HotKey::new(key, move || {
            let queue = queue.clone();
            let repo = Arc::clone(&repo);
            let name = Arc::clone(&name);
            let query = query.clone();
            async move {
                fetch_page(&queue, &repo, &name, query)
                    .await
                    .map_err(anyhow::Error::from)
            }
        })
    }
}

impl std::fmt::Debug for ResourceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceService")
            .field("name", &self.name)
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}

/// Loads one listing page through the queue, as a JSON payload.
async fn fetch_page(
    queue: &TaskQueue,
    repo: &Arc<MemoryRepository>,
    name: &Arc<str>,
    query: ListQuery,
) -> ServiceResult<Value> {
    let repo = Arc::clone(repo);
    let name = Arc::clone(name);

    queue
        .submit(move || async move {
            let page = repo.list(&name, &query).await?;
            serde_json::to_value(page).map_err(|err| RepoError::Storage(err.to_string()))
        })?
        .await
}
