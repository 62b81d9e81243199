//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Which cache backend the server runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Expiring in-process store, lost on restart
    Memory,
    /// One integrity-checked file per entry under `cache_dir`
    File,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(Backend::Memory),
            "file" | "disk" => Ok(Backend::File),
            other => Err(format!("unknown cache backend '{}'", other)),
        }
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cache backend to serve
    pub backend: Backend,
    /// Root directory of the file backend
    pub cache_dir: PathBuf,
    /// Whether the file backend compresses its envelopes
    pub compress: bool,
    /// Default TTL in milliseconds for entries without explicit TTL (0 = none)
    pub default_ttl_ms: u64,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_BACKEND` - `memory` or `file` (default: memory)
    /// - `CACHE_DIR` - File backend root (default: ./cache-data)
    /// - `CACHE_COMPRESS` - Compress file entries (default: false)
    /// - `DEFAULT_TTL_MS` - Default TTL in milliseconds, 0 for none (default: 0)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            backend: parse_env("CACHE_BACKEND").unwrap_or(defaults.backend),
            cache_dir: env::var_os("CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            compress: parse_env("CACHE_COMPRESS").unwrap_or(defaults.compress),
            default_ttl_ms: parse_env("DEFAULT_TTL_MS").unwrap_or(defaults.default_ttl_ms),
            server_port: parse_env("SERVER_PORT").unwrap_or(defaults.server_port),
        }
    }

    /// Default TTL as a duration, None when disabled.
    pub fn default_ttl(&self) -> Option<Duration> {
        (self.default_ttl_ms > 0).then(|| Duration::from_millis(self.default_ttl_ms))
    }
}

fn parse_env<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::Memory,
            cache_dir: PathBuf::from("./cache-data"),
            compress: false,
            default_ttl_ms: 0,
            server_port: 3000,
        }
    }
}
