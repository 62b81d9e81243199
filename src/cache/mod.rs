//! Cache Module
//!
//! The section-namespaced cache contract and its two backends: an expiring
//! in-memory store and a durable file store.

mod byte_cache;
mod entry;
pub mod file;
pub mod memory;
mod stats;
mod traits;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use byte_cache::{
    is_valid_name, validate_cache_key, validate_key, validate_section, validate_ttl, ByteCache,
    ALLOWED_PUNCTUATION,
};
pub use entry::{current_timestamp_ms, CacheEntry};
pub use file::FileCache;
pub use memory::MemoryCache;
pub use stats::{CacheStats, StatsRecorder};
pub use traits::Cache;
