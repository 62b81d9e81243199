//! Byte-cache helpers and the section/key validator shared by all backends.

use std::time::Duration;

use tracing::warn;

use crate::cache::Cache;
use crate::error::{CacheError, Result};

/// Punctuation allowed in section and key names besides ASCII alphanumerics.
pub const ALLOWED_PUNCTUATION: &[char] = &[',', '-', '+', '#', '_', '~', '(', ')', '[', ']', '$'];

// == Validation ==
/// Returns true if `name` is non-empty and uses only the allowed charset.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || ALLOWED_PUNCTUATION.contains(&c))
}

/// Fails with `InvalidArgument` unless `section` is a valid name.
pub fn validate_section(section: &str) -> Result<()> {
    if is_valid_name(section) {
        Ok(())
    } else {
        Err(CacheError::invalid(format!(
            "section {:?} must be non-empty and use only [A-Za-z0-9,-+#_~()[]$]",
            section
        )))
    }
}

/// Fails with `InvalidArgument` unless `key` is a valid name.
pub fn validate_key(key: &str) -> Result<()> {
    if is_valid_name(key) {
        Ok(())
    } else {
        Err(CacheError::invalid(format!(
            "key {:?} must be non-empty and use only [A-Za-z0-9,-+#_~()[]$]",
            key
        )))
    }
}

/// Validates a section and key together.
pub fn validate_cache_key(section: &str, key: &str) -> Result<()> {
    validate_section(section)?;
    validate_key(key)
}

/// Fails with `InvalidArgument` if a TTL was given but is zero.
pub fn validate_ttl(ttl: Option<Duration>) -> Result<()> {
    match ttl {
        Some(ttl) if ttl.is_zero() => Err(CacheError::invalid("ttl must be greater than zero")),
        _ => Ok(()),
    }
}

// == Byte Cache ==
/// String helpers over any cache storing raw bytes.
pub trait ByteCache: Cache<Vec<u8>> {
    /// Stores `value` as UTF-8 bytes.
    fn put_string(&self, section: &str, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        self.put(section, key, value.as_bytes().to_vec(), ttl)
    }

    /// Stores `value` as UTF-8 bytes unless a live entry exists.
    fn put_string_if_absent(
        &self,
        section: &str,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool> {
        self.put_if_absent(section, key, value.as_bytes().to_vec(), ttl)
    }

    /// Reads a value back as a string. Bytes that are not UTF-8 read as a miss.
    fn get_string(&self, section: &str, key: &str) -> Result<Option<String>> {
        Ok(self.get(section, key)?.and_then(|bytes| {
            String::from_utf8(bytes)
                .map_err(|e| warn!(section, key, "cached value is not valid UTF-8: {}", e))
                .ok()
        }))
    }
}

impl<T: Cache<Vec<u8>> + ?Sized> ByteCache for T {}
