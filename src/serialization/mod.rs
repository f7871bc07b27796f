//! Value encoding: a postcard envelope around a JSON payload.
//!
//! Every value the store writes to either tier has this layout:
//! ```text
//! ┌─────────────────┬─────────────────┬──────────────────────────────┐
//! │  MAGIC (4 bytes)│VERSION (varint) │PAYLOAD (len varint + N bytes)│
//! └─────────────────┴─────────────────┴──────────────────────────────┘
//!   "DTCK"              u32               serde_json::to_vec(T)
//! ```
//!
//! The fresh and stale copies of a key are byte-identical, so a stale hit
//! decodes exactly like a fresh one. The payload is self-describing JSON, so
//! any `Serialize + DeserializeOwned` value reads back, including
//! `serde_json::Value` and other types that rely on `deserialize_any`.
//! Values JSON cannot represent (maps with non-string keys that are not
//! numbers) are rejected at write time.
//!
//! ```rust
//! use dual_tier_cache::serialization::{serialize_for_cache, deserialize_from_cache};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! # fn main() -> dual_tier_cache::Result<()> {
//! let user = User { id: 42, name: "Alice".to_string() };
//! let bytes = serialize_for_cache(&user)?;
//! let decoded: User = deserialize_from_cache(&bytes)?;
//! assert_eq!(user, decoded);
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Magic header for entries written by this crate: b"DTCK"
pub const CACHE_MAGIC: [u8; 4] = *b"DTCK";

/// Current schema version.
///
/// Increment when cached types change shape; entries carrying an older
/// version fail to decode with `Error::VersionMismatch`.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Versioned envelope wrapped around every cached value.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CacheEnvelope<T> {
    /// Magic header: must be b"DTCK"
    pub magic: [u8; 4],
    /// Schema version: must match CURRENT_SCHEMA_VERSION
    pub version: u32,
    /// The cached value (JSON bytes when written by this crate)
    pub payload: T,
}

impl<T> CacheEnvelope<T> {
    /// Create a new envelope with current magic and version.
    pub fn new(payload: T) -> Self {
        Self {
            magic: CACHE_MAGIC,
            version: CURRENT_SCHEMA_VERSION,
            payload,
        }
    }
}

/// Serialize a value with envelope for storage in either tier.
///
/// # Errors
///
/// Returns `Error::SerializationError` if the value has no JSON form or
/// Postcard serialization fails.
pub fn serialize_for_cache<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let payload = serde_json::to_vec(value).map_err(|e| {
        error!("Cache payload serialization failed: {}", e);
        Error::SerializationError(e.to_string())
    })?;

    postcard::to_allocvec(&CacheEnvelope::new(payload)).map_err(|e| {
        error!("Cache serialization failed: {}", e);
        Error::SerializationError(e.to_string())
    })
}

/// Deserialize a value read from either tier.
///
/// Checks the magic header, then the schema version, then decodes the payload.
///
/// # Errors
///
/// - `Error::InvalidCacheEntry`: Invalid magic header
/// - `Error::VersionMismatch`: Schema version mismatch
/// - `Error::DeserializationError`: Corrupted envelope, or a payload that
///   does not decode as `T`
pub fn deserialize_from_cache<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let envelope: CacheEnvelope<Vec<u8>> = postcard::from_bytes(bytes).map_err(|e| {
        error!("Cache deserialization failed: {}", e);
        Error::DeserializationError(e.to_string())
    })?;

    if envelope.magic != CACHE_MAGIC {
        warn!(
            "Invalid cache entry: expected magic {:?}, got {:?}",
            CACHE_MAGIC, envelope.magic
        );
        return Err(Error::InvalidCacheEntry(format!(
            "Invalid magic: expected {:?}, got {:?}",
            CACHE_MAGIC, envelope.magic
        )));
    }

    if envelope.version != CURRENT_SCHEMA_VERSION {
        warn!(
            "Cache version mismatch: expected {}, got {}",
            CURRENT_SCHEMA_VERSION, envelope.version
        );
        return Err(Error::VersionMismatch {
            expected: CURRENT_SCHEMA_VERSION,
            found: envelope.version,
        });
    }

    serde_json::from_slice(&envelope.payload).map_err(|e| {
        error!("Cache payload deserialization failed: {}", e);
        Error::DeserializationError(e.to_string())
    })
}
