//! Durable File Cache
//!
//! Each entry is one file at `<root>/<section>/<shard>/<key>`, where the shard
//! is the first three characters of the key (or `_` for shorter keys). Writes
//! go to a temp file under `<root>/.tmp/` and are renamed into place, so a
//! reader sees either the old value or the new one, never a partial write.
//! Entries that fail the integrity check or have expired are deleted when
//! read.

pub mod envelope;

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::cache::byte_cache::{validate_cache_key, validate_section, validate_ttl};
use crate::cache::entry::{current_timestamp_ms, deadline_after};
use crate::cache::{Cache, CacheStats, StatsRecorder};
use crate::error::{CacheError, Result};

/// Staging directory for in-flight writes, relative to the cache root.
pub const STAGING_DIR: &str = ".tmp";

/// Keys shorter than this are filed under the `_` shard.
const SHARD_LEN: usize = 3;

// == File Cache ==
/// Byte cache persisted as one integrity-checked file per entry.
#[derive(Debug)]
pub struct FileCache {
    root: PathBuf,
    staging: PathBuf,
    compress: bool,
    default_ttl: Option<Duration>,
    stats: StatsRecorder,
}

impl FileCache {
    // == Constructor ==
    /// Opens a cache rooted at `root`, creating the directory layout.
    ///
    /// Fails with `CacheError::Init` if the root or staging directory cannot
    /// be created.
    pub fn open(root: impl Into<PathBuf>, compress: bool) -> Result<Self> {
        let root = root.into();
        let staging = root.join(STAGING_DIR);
        fs::create_dir_all(&staging).map_err(|source| CacheError::Init {
            path: staging.clone(),
            source,
        })?;

        info!(root = %root.display(), compress, "File cache opened");
        Ok(Self {
            root,
            staging,
            compress,
            default_ttl: None,
            stats: StatsRecorder::new(),
        })
    }

    /// Applies `ttl` to every `put` that does not pass its own.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Result<Self> {
        validate_ttl(Some(ttl))?;
        self.default_ttl = Some(ttl);
        Ok(self)
    }

    // == Paths ==
    /// Location of the file backing `(section, key)`.
    pub fn entry_path(&self, section: &str, key: &str) -> PathBuf {
        // Keys are ASCII once validated, so byte slicing is safe
        let shard = key.get(..SHARD_LEN).unwrap_or("_");
        self.root.join(section).join(shard).join(key)
    }

    // == Write Path ==
    /// Encodes and atomically installs an entry. Returns whether it landed.
    fn write(&self, path: &Path, value: &[u8], ttl: Option<Duration>, overwrite: bool) -> bool {
        let expires_at = ttl
            .or(self.default_ttl)
            .and_then(|ttl| deadline_after(current_timestamp_ms(), ttl));

        match self.stage_and_rename(path, value, expires_at, overwrite) {
            Ok(()) => true,
            Err(e) if !overwrite && e.kind() == ErrorKind::AlreadyExists => false,
            Err(e) => {
                warn!(path = %path.display(), "Failed to write cache entry: {}", e);
                false
            }
        }
    }

    fn stage_and_rename(
        &self,
        path: &Path,
        value: &[u8],
        expires_at: Option<u64>,
        overwrite: bool,
    ) -> std::io::Result<()> {
        let encoded = envelope::encode(value, expires_at);
        let bytes = if self.compress {
            envelope::compress(&encoded)?
        } else {
            encoded
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // A concurrent clear() may have removed the staging directory
        fs::create_dir_all(&self.staging)?;

        // The temp file deletes itself if it is dropped before being persisted
        let mut staged = NamedTempFile::new_in(&self.staging)?;
        staged.write_all(&bytes)?;
        staged.as_file().sync_all()?;

        let persisted = if overwrite {
            staged.persist(path)
        } else {
            staged.persist_noclobber(path)
        };
        persisted.map(|_| ()).map_err(|e| e.error)
    }

    // == Read Path ==
    /// Reads, decompresses, parses and checks the entry at `path`.
    fn load(&self, path: &Path) -> Result<Vec<u8>> {
        let raw = fs::read(path)?;
        let bytes = if self.compress {
            envelope::decompress(&raw)?
        } else {
            raw
        };

        let entry = envelope::decode(&bytes)?;
        entry.verify()?;
        if entry.is_expired_at(current_timestamp_ms()) {
            return Err(CacheError::Expired(path.display().to_string()));
        }
        Ok(entry.payload)
    }

    /// Returns the payload at `path`, deleting the file if it is unusable.
    fn read_live(&self, path: &Path) -> Option<Vec<u8>> {
        match self.load(path) {
            Ok(payload) => Some(payload),
            Err(CacheError::Io(e)) if e.kind() == ErrorKind::NotFound => None,
            Err(err) => {
                match &err {
                    CacheError::Integrity(reason) => {
                        self.stats.record_integrity_failure();
                        warn!(path = %path.display(), "Discarding corrupt cache entry: {}", reason);
                    }
                    CacheError::Expired(_) => {
                        self.stats.record_expirations(1);
                        debug!(path = %path.display(), "Discarding expired cache entry");
                    }
                    other => {
                        warn!(path = %path.display(), "Failed to read cache entry: {}", other);
                    }
                }
                self.discard(path);
                None
            }
        }
    }

    /// Best-effort delete of an entry file.
    fn discard(&self, path: &Path) {
        if let Err(e) = fs::remove_file(path) {
            if e.kind() != ErrorKind::NotFound {
                warn!(path = %path.display(), "Failed to delete cache entry: {}", e);
            }
        }
    }
}

impl Cache<Vec<u8>> for FileCache {
    fn validate(&self) -> bool {
        match fs::create_dir_all(&self.staging) {
            Ok(()) => true,
            Err(e) => {
                warn!(root = %self.root.display(), "File cache directories unusable: {}", e);
                false
            }
        }
    }

    fn contains(&self, section: &str, key: &str) -> Result<bool> {
        validate_cache_key(section, key)?;
        Ok(self.entry_path(section, key).is_file())
    }

    fn put(&self, section: &str, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        validate_cache_key(section, key)?;
        validate_ttl(ttl)?;
        self.write(&self.entry_path(section, key), &value, ttl, true);
        Ok(())
    }

    fn put_if_absent(
        &self,
        section: &str,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<bool> {
        validate_cache_key(section, key)?;
        validate_ttl(ttl)?;
        let path = self.entry_path(section, key);
        // Clears out an expired or corrupt file so it does not block the write
        if self.read_live(&path).is_some() {
            return Ok(false);
        }
        Ok(self.write(&path, &value, ttl, false))
    }

    fn get(&self, section: &str, key: &str) -> Result<Option<Vec<u8>>> {
        validate_cache_key(section, key)?;
        let value = self.read_live(&self.entry_path(section, key));
        if value.is_some() {
            self.stats.record_hit();
        } else {
            self.stats.record_miss();
        }
        Ok(value)
    }

    fn remove(&self, section: &str, key: &str) -> Result<bool> {
        validate_cache_key(section, key)?;
        let path = self.entry_path(section, key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => {
                warn!(path = %path.display(), "Failed to remove cache entry: {}", e);
                Ok(false)
            }
        }
    }

    fn clear_section(&self, section: &str) -> Result<()> {
        validate_section(section)?;
        let dir = self.root.join(section);
        match fs::remove_dir_all(&dir) {
            Ok(()) => debug!(section, "Cleared cache section"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(dir = %dir.display(), "Failed to clear cache section: {}", e),
        }
        Ok(())
    }

    fn clear(&self) {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(root = %self.root.display(), "Failed to list cache root: {}", e);
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let removed = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            if let Err(e) = removed {
                if e.kind() != ErrorKind::NotFound {
                    warn!(path = %path.display(), "Failed to clear cache path: {}", e);
                }
            }
        }

        if let Err(e) = fs::create_dir_all(&self.staging) {
            warn!(path = %self.staging.display(), "Failed to re-create staging directory: {}", e);
        }
        info!(root = %self.root.display(), "File cache cleared");
    }

    fn close(&self) {}

    fn stats(&self) -> CacheStats {
        self.stats.snapshot(None)
    }
}
