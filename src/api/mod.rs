//! API Module
//!
//! HTTP handlers and routing for the enrollment REST API.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET /status` - Queue and cache counters per resource
//! - `GET /api/:resource` - List records (paginated, searchable, filterable)
//! - `POST /api/:resource` - Create a record
//! - `GET /api/:resource/:id` - Fetch one record
//! - `PUT /api/:resource/:id` - Update a record
//! - `DELETE /api/:resource/:id` - Delete a record

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
