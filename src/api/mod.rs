//! API Module
//!
//! HTTP handlers and routing for the cache server REST API.
//!
//! # Endpoints
//! - `PUT /cache/:section/:key` - Store a value
//! - `GET /cache/:section/:key` - Retrieve a value
//! - `DELETE /cache/:section/:key` - Delete a key
//! - `DELETE /cache/:section` - Clear a section
//! - `DELETE /cache` - Clear everything
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
