//! Section Cache - a namespaced key-value cache with per-entry TTL
//!
//! Two backends share one contract: an in-memory store whose entries are
//! purged by a background reaper, and a durable file store that verifies
//! every read against a SHA-1 digest. A small HTTP server fronts either one.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;

pub use api::AppState;
pub use cache::{ByteCache, Cache, FileCache, MemoryCache};
pub use config::{Backend, Config};
pub use error::{CacheError, Result};
