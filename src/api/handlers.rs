//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint. Backend calls may
//! block on locks or the filesystem, so they run on the blocking pool.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::error;

use crate::cache::{ByteCache, FileCache, MemoryCache};
use crate::config::{Backend, Config};
use crate::error::{CacheError, Result};
use crate::models::{
    ClearResponse, DeleteResponse, GetResponse, HealthResponse, PutRequest, PutResponse,
    StatsResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The backend serving every request
    pub cache: Arc<dyn ByteCache>,
}

impl AppState {
    /// Creates a new AppState around the given backend.
    pub fn new<C: ByteCache + 'static>(cache: C) -> Self {
        Self {
            cache: Arc::new(cache),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Opens the configured backend and applies the default TTL, if any.
    pub fn from_config(config: &Config) -> Result<Self> {
        let default_ttl = config.default_ttl();
        let state = match config.backend {
            Backend::Memory => {
                let cache: MemoryCache<Vec<u8>> = match default_ttl {
                    Some(ttl) => MemoryCache::with_default_ttl(ttl)?,
                    None => MemoryCache::new()?,
                };
                Self::new(cache)
            }
            Backend::File => {
                let mut cache = FileCache::open(&config.cache_dir, config.compress)?;
                if let Some(ttl) = default_ttl {
                    cache = cache.with_default_ttl(ttl)?;
                }
                Self::new(cache)
            }
        };
        Ok(state)
    }

    /// Runs `f` against the backend on the blocking thread pool.
    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn ByteCache) -> Result<T> + Send + 'static,
    {
        let cache = Arc::clone(&self.cache);
        tokio::task::spawn_blocking(move || f(cache.as_ref()))
            .await
            .map_err(|e| CacheError::Internal(format!("cache task failed: {}", e)))?
    }
}

/// Handler for PUT /cache/:section/:key
///
/// Stores a value with optional TTL; `if_absent` skips the write when the
/// key is already live.
pub async fn put_handler(
    State(state): State<AppState>,
    Path((section, key)): Path<(String, String)>,
    Json(req): Json<PutRequest>,
) -> Result<Json<PutResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidArgument(error_msg));
    }
    let ttl = req.ttl();
    let if_absent = req.if_absent;
    let value = req
        .value
        .ok_or_else(|| CacheError::invalid("Value is required"))?;

    let (s, k) = (section.clone(), key.clone());
    let stored = state
        .run(move |cache| {
            if if_absent {
                cache.put_string_if_absent(&s, &k, &value, ttl)
            } else {
                cache.put_string(&s, &k, &value, ttl).map(|()| true)
            }
        })
        .await?;

    Ok(Json(PutResponse::new(section, key, stored)))
}

/// Handler for GET /cache/:section/:key
///
/// Retrieves a live value; misses, expired and corrupt entries are 404.
pub async fn get_handler(
    State(state): State<AppState>,
    Path((section, key)): Path<(String, String)>,
) -> Result<Json<GetResponse>> {
    let (s, k) = (section.clone(), key.clone());
    let value = state.run(move |cache| cache.get_string(&s, &k)).await?;

    match value {
        Some(value) => Ok(Json(GetResponse::new(section, key, value))),
        None => Err(CacheError::NotFound(format!("{}/{}", section, key))),
    }
}

/// Handler for DELETE /cache/:section/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path((section, key)): Path<(String, String)>,
) -> Result<Json<DeleteResponse>> {
    let (s, k) = (section.clone(), key.clone());
    let removed = state.run(move |cache| cache.remove(&s, &k)).await?;

    if !removed {
        return Err(CacheError::NotFound(format!("{}/{}", section, key)));
    }
    Ok(Json(DeleteResponse::new(section, key)))
}

/// Handler for DELETE /cache/:section
pub async fn clear_section_handler(
    State(state): State<AppState>,
    Path(section): Path<String>,
) -> Result<Json<ClearResponse>> {
    let s = section.clone();
    state.run(move |cache| cache.clear_section(&s)).await?;

    Ok(Json(ClearResponse::section(&section)))
}

/// Handler for DELETE /cache
pub async fn clear_handler(State(state): State<AppState>) -> Result<Json<ClearResponse>> {
    state
        .run(|cache| {
            cache.clear();
            Ok(())
        })
        .await?;

    Ok(Json(ClearResponse::all()))
}

/// Handler for GET /stats
///
/// Returns current cache statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let stats = state.run(|cache| Ok(cache.stats())).await?;

    Ok(Json(StatsResponse::from(stats)))
}

/// Handler for GET /health
///
/// 200 when the backend validates, 503 otherwise.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let healthy = match state.run(|cache| Ok(cache.validate())).await {
        Ok(healthy) => healthy,
        Err(e) => {
            error!("Health check failed: {}", e);
            false
        }
    };

    if healthy {
        (StatusCode::OK, Json(HealthResponse::healthy()))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(HealthResponse::unhealthy()))
    }
}
