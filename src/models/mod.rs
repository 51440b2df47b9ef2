//! Request and Response models for the enrollment API
//!
//! This module defines the DTOs used for serializing/deserializing HTTP
//! request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::RecordRequest;
pub use responses::{DeleteResponse, HealthResponse, ResourceStatus, StatusResponse};
