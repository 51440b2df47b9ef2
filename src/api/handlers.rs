//! API Handlers
//!
//! HTTP request handlers for the health, status and resource endpoints.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::keys::ListQuery;
use crate::models::{DeleteResponse, HealthResponse, RecordRequest, StatusResponse};
use crate::resource::{MemoryRepository, ResourceRegistry, RESOURCES};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ResourceRegistry>,
}

impl AppState {
    pub fn new(registry: ResourceRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Starts one queue and cache per resource over a fresh in-memory
    /// repository. Must be called inside a Tokio runtime.
    pub fn from_config(config: &Config) -> Self {
        let repo = Arc::new(MemoryRepository::new(RESOURCES));
        Self::new(ResourceRegistry::start(config, repo))
    }
}

/// Handler for GET /api/:resource
///
/// Query parameters `page`, `limit` and `search` shape the page; any other
/// parameter is an equality filter on the record field of that name.
pub async fn list_handler(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>> {
    let service = state.registry.service(&resource)?;
    let page = service.list(ListQuery::from_params(&params)).await?;

    Ok(Json(page))
}

/// Handler for GET /api/:resource/:id
pub async fn get_handler(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, u64)>,
) -> Result<Json<Value>> {
    let service = state.registry.service(&resource)?;
    let record = service.get(id).await?;

    Ok(Json(record))
}

/// Handler for POST /api/:resource
pub async fn create_handler(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    Json(req): Json<RecordRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let service = state.registry.service(&resource)?;
    if let Some(error_msg) = req.validate() {
        return Err(ApiError::InvalidRequest(error_msg));
    }

    let record = service.create(req.into_fields()).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Handler for PUT /api/:resource/:id
pub async fn update_handler(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, u64)>,
    Json(req): Json<RecordRequest>,
) -> Result<Json<Value>> {
    let service = state.registry.service(&resource)?;
    if let Some(error_msg) = req.validate() {
        return Err(ApiError::InvalidRequest(error_msg));
    }

    let record = service.update(id, req.into_fields()).await?;
    Ok(Json(record))
}

/// Handler for DELETE /api/:resource/:id
pub async fn delete_handler(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, u64)>,
) -> Result<Json<DeleteResponse>> {
    let service = state.registry.service(&resource)?;
    service.delete(id).await?;

    Ok(Json(DeleteResponse::new(&resource, id)))
}

/// Handler for GET /status
///
/// Returns queue and cache counters for every resource.
pub async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse::new(state.registry.statuses().await))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
