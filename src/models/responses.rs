//! Response DTOs for the enrollment API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::CacheStatsSnapshot;
use crate::queue::QueueStatsSnapshot;

/// Response body for the DELETE operation (DELETE /api/:resource/:id)
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
    /// Id of the deleted record
    pub id: u64,
}

impl DeleteResponse {
    /// Creates a new DeleteResponse
    pub fn new(resource: &str, id: u64) -> Self {
        Self {
            message: format!("{} record {} deleted successfully", resource, id),
            id,
        }
    }
}

/// Queue and cache counters of one resource family.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceStatus {
    pub resource: String,
    pub queue: QueueStatsSnapshot,
    pub cache: CacheStatsSnapshot,
}

/// Response body for the status endpoint (GET /status)
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
    pub resources: Vec<ResourceStatus>,
}

impl StatusResponse {
    pub fn new(resources: Vec<ResourceStatus>) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            resources,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
