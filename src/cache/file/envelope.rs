//! On-disk envelope for file cache entries.
//!
//! Layout, little-endian:
//!
//! ```text
//! i32        hash length
//! [u8; len]  SHA-1 of the payload
//! i64        expiration time in Unix millis, i64::MAX for never
//! [u8]       payload
//! ```
//!
//! The whole buffer may additionally be wrapped in a zlib stream.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use sha1::{Digest, Sha1};

use crate::error::{CacheError, Result};

/// Expiration sentinel meaning "never expires".
pub const NEVER_EXPIRES: i64 = i64::MAX;

const LENGTH_FIELD: usize = 4;
const EXPIRY_FIELD: usize = 8;
const SHA1_LEN: usize = 20;

/// A decoded envelope whose hash has not been checked yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub hash: Vec<u8>,
    pub expires_at: Option<u64>,
    pub payload: Vec<u8>,
}

impl Envelope {
    /// Fails with `Integrity` unless the stored hash matches the payload.
    pub fn verify(&self) -> Result<()> {
        if self.hash.as_slice() == sha1_digest(&self.payload).as_slice() {
            Ok(())
        } else {
            Err(CacheError::Integrity("payload hash mismatch".to_string()))
        }
    }

    pub fn is_expired_at(&self, now: u64) -> bool {
        self.expires_at.is_some_and(|expires| now > expires)
    }
}

fn sha1_digest(payload: &[u8]) -> [u8; SHA1_LEN] {
    let mut out = [0u8; SHA1_LEN];
    out.copy_from_slice(&Sha1::digest(payload));
    out
}

// == Encoding ==
/// Serializes `payload` with its hash and expiration time.
pub fn encode(payload: &[u8], expires_at: Option<u64>) -> Vec<u8> {
    let hash = sha1_digest(payload);
    let expires = expires_at
        .and_then(|millis| i64::try_from(millis).ok())
        .unwrap_or(NEVER_EXPIRES);

    let mut buf = Vec::with_capacity(LENGTH_FIELD + SHA1_LEN + EXPIRY_FIELD + payload.len());
    buf.extend_from_slice(&(SHA1_LEN as i32).to_le_bytes());
    buf.extend_from_slice(&hash);
    buf.extend_from_slice(&expires.to_le_bytes());
    buf.extend_from_slice(payload);
    buf
}

/// Parses an envelope, failing with `Integrity` if it is truncated or malformed.
pub fn decode(bytes: &[u8]) -> Result<Envelope> {
    let (len_bytes, rest) = split(bytes, LENGTH_FIELD, "hash length")?;
    let hash_len = i32::from_le_bytes(to_array(len_bytes));
    let hash_len = usize::try_from(hash_len)
        .map_err(|_| CacheError::Integrity(format!("negative hash length {}", hash_len)))?;

    let (hash, rest) = split(rest, hash_len, "hash")?;
    let (expiry_bytes, payload) = split(rest, EXPIRY_FIELD, "expiration time")?;
    let expires = i64::from_le_bytes(to_array(expiry_bytes));

    let expires_at = match expires {
        NEVER_EXPIRES => None,
        millis => Some(u64::try_from(millis).unwrap_or(0)),
    };

    Ok(Envelope {
        hash: hash.to_vec(),
        expires_at,
        payload: payload.to_vec(),
    })
}

fn split<'a>(bytes: &'a [u8], len: usize, field: &str) -> Result<(&'a [u8], &'a [u8])> {
    if bytes.len() < len {
        return Err(CacheError::Integrity(format!(
            "envelope truncated in {} ({} of {} bytes)",
            field,
            bytes.len(),
            len
        )));
    }
    Ok(bytes.split_at(len))
}

fn to_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    out
}

// == Compression ==
pub fn compress(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    encoder.finish()
}

/// Inflates a compressed envelope. A damaged stream reads as `Integrity`.
pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(bytes);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| CacheError::Integrity(format!("corrupt compressed envelope: {}", e)))?;
    Ok(out)
}
