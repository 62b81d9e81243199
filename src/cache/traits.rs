//! The operation set every cache backend implements.

use std::time::Duration;

use crate::cache::CacheStats;
use crate::error::Result;

/// A section-namespaced key-value cache with optional per-entry TTL.
///
/// Sections and keys must be non-empty and use only the characters accepted
/// by [`is_valid_name`](crate::cache::is_valid_name). Breaking that rule, or
/// passing a zero TTL, fails with [`CacheError::InvalidArgument`]; it is the
/// only error a backend returns from these methods. Every other failure is
/// logged and degrades to a miss or a no-op, so a broken cache looks empty
/// rather than returning stale or corrupt data.
///
/// [`CacheError::InvalidArgument`]: crate::error::CacheError::InvalidArgument
pub trait Cache<V>: Send + Sync {
    /// Confirms that backend resources are usable, creating them if needed.
    fn validate(&self) -> bool;

    /// Reports whether `key` is present in `section`.
    ///
    /// How authoritative this is depends on the backend: the in-memory cache
    /// answers exactly like `get`, the file cache only checks for the backing
    /// file.
    fn contains(&self, section: &str, key: &str) -> Result<bool>;

    /// Stores `value`, replacing any existing entry.
    fn put(&self, section: &str, key: &str, value: V, ttl: Option<Duration>) -> Result<()>;

    /// Stores `value` only if no live entry exists. Returns whether it wrote.
    fn put_if_absent(
        &self,
        section: &str,
        key: &str,
        value: V,
        ttl: Option<Duration>,
    ) -> Result<bool>;

    /// Returns the value if it is present, unexpired and intact.
    fn get(&self, section: &str, key: &str) -> Result<Option<V>>;

    /// Deletes an entry. Returns true iff one existed.
    fn remove(&self, section: &str, key: &str) -> Result<bool>;

    /// Deletes every entry in `section`.
    fn clear_section(&self, section: &str) -> Result<()>;

    /// Deletes every entry in every section.
    fn clear(&self);

    /// Releases background resources. Safe to call more than once.
    fn close(&self);

    /// Returns a snapshot of the backend's counters.
    fn stats(&self) -> CacheStats;
}
