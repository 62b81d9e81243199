//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::CacheStats;

/// Response body for the GET operation (GET /cache/:section/:key)
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    pub section: String,
    pub key: String,
    /// The stored value
    pub value: String,
}

impl GetResponse {
    /// Creates a new GetResponse
    pub fn new(section: impl Into<String>, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Response body for the PUT operation (PUT /cache/:section/:key)
#[derive(Debug, Clone, Serialize)]
pub struct PutResponse {
    /// Outcome message
    pub message: String,
    pub section: String,
    pub key: String,
    /// False when `if_absent` found a live entry and skipped the write
    pub stored: bool,
}

impl PutResponse {
    /// Creates a new PutResponse
    pub fn new(section: impl Into<String>, key: impl Into<String>, stored: bool) -> Self {
        let section = section.into();
        let key = key.into();
        let message = if stored {
            format!("Key '{}/{}' set successfully", section, key)
        } else {
            format!("Key '{}/{}' already present", section, key)
        };
        Self {
            message,
            section,
            key,
            stored,
        }
    }
}

/// Response body for the DELETE operation (DELETE /cache/:section/:key)
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
    pub section: String,
    pub key: String,
}

impl DeleteResponse {
    /// Creates a new DeleteResponse
    pub fn new(section: impl Into<String>, key: impl Into<String>) -> Self {
        let section = section.into();
        let key = key.into();
        Self {
            message: format!("Key '{}/{}' deleted successfully", section, key),
            section,
            key,
        }
    }
}

/// Response body for bulk deletes (DELETE /cache/:section, DELETE /cache)
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub message: String,
}

impl ClearResponse {
    pub fn section(section: &str) -> Self {
        Self {
            message: format!("Section '{}' cleared", section),
        }
    }

    pub fn all() -> Self {
        Self {
            message: "Cache cleared".to_string(),
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Number of entries removed by TTL
    pub expirations: u64,
    /// Number of entries discarded by the integrity check
    pub integrity_failures: u64,
    /// Current number of entries, when the backend tracks it
    pub total_entries: Option<usize>,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            expirations: stats.expirations,
            integrity_failures: stats.integrity_failures,
            total_entries: stats.total_entries,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status ("healthy" or "unhealthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self::with_status("healthy")
    }

    pub fn unhealthy() -> Self {
        Self::with_status("unhealthy")
    }

    fn with_status(status: &str) -> Self {
        Self {
            status: status.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
