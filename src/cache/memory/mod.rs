//! In-Memory Expiring Cache
//!
//! Entries live in per-section maps, each behind its own read/write lock,
//! with a per-section min-heap of pending expirations. Reads treat expired
//! entries as misses without removing them; a background reaper thread
//! removes them physically.
//!
//! # Lock ordering
//! A section lock is always taken before the top-level registry lock, and
//! [`Shared::with_section_locked`] is the only place that holds both. Creating
//! a section takes the registry lock alone, and no code path holds two
//! section locks at once.

mod reaper;
mod section;

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::cache::byte_cache::{validate_cache_key, validate_section, validate_ttl};
use crate::cache::entry::current_timestamp_ms;
use crate::cache::{Cache, CacheEntry, CacheStats, StatsRecorder};
use crate::error::{CacheError, Result};

use reaper::WakeSignal;
use section::{Section, SectionState};

// == Registry ==
/// Everything guarded by the top-level lock.
struct Registry<V> {
    sections: HashMap<String, Arc<Section<V>>>,
    closed: bool,
}

/// State shared between the cache handle and its reaper thread.
pub(crate) struct Shared<V> {
    registry: RwLock<Registry<V>>,
    wake: WakeSignal,
    stats: StatsRecorder,
    default_ttl: Option<Duration>,
}

impl<V> Shared<V> {
    /// Looks up an existing section.
    fn section(&self, name: &str) -> Option<Arc<Section<V>>> {
        let registry = self.registry.read();
        if registry.closed {
            return None;
        }
        registry.sections.get(name).cloned()
    }

    /// Looks up a section, creating it on first use. None once closed.
    fn section_or_create(&self, name: &str) -> Option<Arc<Section<V>>> {
        if let Some(section) = self.section(name) {
            return Some(section);
        }
        let mut registry = self.registry.write();
        if registry.closed {
            return None;
        }
        let section = registry
            .sections
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(section = name, "Creating cache section");
                Arc::new(RwLock::new(SectionState::default()))
            })
            .clone();
        Some(section)
    }

    fn sections_snapshot(&self) -> Vec<Arc<Section<V>>> {
        self.registry.read().sections.values().cloned().collect()
    }

    /// Runs `f` holding the section write lock and then the registry read lock.
    ///
    /// Returns None without running `f` if the cache has been closed.
    fn with_section_locked<R>(
        &self,
        section: &Section<V>,
        f: impl FnOnce(&mut SectionState<V>) -> R,
    ) -> Option<R> {
        let mut state = section.write();
        let registry = self.registry.read();
        if registry.closed {
            return None;
        }
        Some(f(&mut state))
    }
}

// == Memory Cache ==
/// Thread-safe in-process cache with per-entry TTL.
pub struct MemoryCache<V> {
    shared: Arc<Shared<V>>,
    reaper: Mutex<Option<JoinHandle<()>>>,
}

impl<V> MemoryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates an empty cache and starts its reaper thread.
    pub fn new() -> Result<Self> {
        Self::build(None)
    }

    /// Creates a cache whose `put` without a TTL uses `default_ttl`.
    pub fn with_default_ttl(default_ttl: Duration) -> Result<Self> {
        validate_ttl(Some(default_ttl))?;
        Self::build(Some(default_ttl))
    }

    fn build(default_ttl: Option<Duration>) -> Result<Self> {
        let shared = Arc::new(Shared {
            registry: RwLock::new(Registry {
                sections: HashMap::new(),
                closed: false,
            }),
            wake: WakeSignal::default(),
            stats: StatsRecorder::new(),
            default_ttl,
        });

        let reaper_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("cache-reaper".to_string())
            .spawn(move || reaper::run(reaper_shared))
            .map_err(|e| CacheError::Internal(format!("failed to start cache reaper: {}", e)))?;

        Ok(Self {
            shared,
            reaper: Mutex::new(Some(handle)),
        })
    }

    /// Writes `value`, unconditionally or only when no live entry exists.
    fn write(
        &self,
        section: &str,
        key: &str,
        value: V,
        ttl: Option<Duration>,
        overwrite: bool,
    ) -> Result<bool> {
        validate_cache_key(section, key)?;
        validate_ttl(ttl)?;

        let Some(handle) = self.shared.section_or_create(section) else {
            return Ok(false);
        };
        let entry = CacheEntry::new(value, ttl.or(self.shared.default_ttl));

        let outcome = self.shared.with_section_locked(&handle, |state| {
            if !overwrite && state.live(key, current_timestamp_ms()).is_some() {
                return None;
            }
            Some(state.insert(key, entry))
        });

        match outcome.flatten() {
            Some(deadline) => {
                if let Some(deadline) = deadline {
                    self.shared.wake.notify_deadline(deadline);
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // == Length ==
    /// Number of entries physically stored, expired ones not yet reaped included.
    pub fn len(&self) -> usize {
        self.shared
            .sections_snapshot()
            .iter()
            .map(|section| section.read().len())
            .sum()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V> Cache<V> for MemoryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn validate(&self) -> bool {
        !self.shared.registry.read().closed
    }

    fn contains(&self, section: &str, key: &str) -> Result<bool> {
        validate_cache_key(section, key)?;
        Ok(self.shared.section(section).is_some_and(|handle| {
            let state = handle.read();
            state.live(key, current_timestamp_ms()).is_some()
        }))
    }

    fn put(&self, section: &str, key: &str, value: V, ttl: Option<Duration>) -> Result<()> {
        self.write(section, key, value, ttl, true).map(|_| ())
    }

    fn put_if_absent(
        &self,
        section: &str,
        key: &str,
        value: V,
        ttl: Option<Duration>,
    ) -> Result<bool> {
        self.write(section, key, value, ttl, false)
    }

    fn get(&self, section: &str, key: &str) -> Result<Option<V>> {
        validate_cache_key(section, key)?;
        let value = self.shared.section(section).and_then(|handle| {
            let state = handle.read();
            state
                .live(key, current_timestamp_ms())
                .map(|entry| entry.value.clone())
        });

        if value.is_some() {
            self.shared.stats.record_hit();
        } else {
            self.shared.stats.record_miss();
        }
        Ok(value)
    }

    fn remove(&self, section: &str, key: &str) -> Result<bool> {
        validate_cache_key(section, key)?;
        let Some(handle) = self.shared.section(section) else {
            return Ok(false);
        };
        let now = current_timestamp_ms();
        Ok(self
            .shared
            .with_section_locked(&handle, |state| state.remove(key, now))
            .unwrap_or(false))
    }

    fn clear_section(&self, section: &str) -> Result<()> {
        validate_section(section)?;
        if let Some(handle) = self.shared.section(section) {
            self.shared.with_section_locked(&handle, SectionState::clear);
        }
        Ok(())
    }

    fn clear(&self) {
        for handle in self.shared.sections_snapshot() {
            self.shared.with_section_locked(&handle, SectionState::clear);
        }
    }

    fn close(&self) {
        if self.shut_down() {
            info!("Memory cache closed");
        }
    }

    fn stats(&self) -> CacheStats {
        self.shared.stats.snapshot(Some(self.len()))
    }
}

impl<V> MemoryCache<V> {
    /// Marks the cache closed, drops its sections and joins the reaper.
    ///
    /// Returns false if the cache was already closed.
    fn shut_down(&self) -> bool {
        {
            let mut registry = self.shared.registry.write();
            if registry.closed {
                return false;
            }
            registry.closed = true;
            registry.sections.clear();
        }

        self.shared.wake.shutdown();
        if let Some(handle) = self.reaper.lock().take() {
            if handle.join().is_err() {
                warn!("Cache reaper exited with a panic");
            }
        }
        true
    }
}

impl<V> Drop for MemoryCache<V> {
    fn drop(&mut self) {
        self.shut_down();
    }
}
