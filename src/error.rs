//! Error types for the dual-tier cache.

use std::fmt;

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the dual-tier cache.
///
/// Errors on the read path (backend, codec, cold start) propagate to the caller.
/// Errors on the rebuild path (submission, resolution, computation) are logged
/// by the store and the worker and never reach a reader.
#[derive(Debug, Clone)]
pub enum Error {
    /// Serialization failed when converting a value to cache bytes.
    SerializationError(String),

    /// Deserialization failed when converting cache bytes to a value.
    ///
    /// This indicates corrupted or malformed data in cache, or a cached type
    /// that no longer matches the requested one.
    ///
    /// **Recovery:** Overwrite the entry with `write`.
    DeserializationError(String),

    /// Backend storage error (Redis, etc).
    ///
    /// Common causes:
    /// - Redis connection lost
    /// - Network timeout
    /// - Backend protocol error
    ///
    /// Propagated unchanged to the caller of the store operation; this layer
    /// does not retry.
    BackendError(String),

    /// `fetch` missed both tiers and no producer was supplied.
    ///
    /// Carries the logical key.
    ColdStartError(String),

    /// The job substrate rejected a rebuild submission.
    ///
    /// Common causes:
    /// - Queue is full
    /// - Worker side has shut down
    ///
    /// The store logs this and still returns the stale value.
    SubmitError(String),

    /// A rebuild descriptor named a target the worker does not know.
    ///
    /// Only produced inside the rebuild worker.
    DescriptorResolutionError(String),

    /// A rebuild target failed to compute a value.
    ///
    /// Only produced inside the rebuild worker.
    ComputationError(String),

    /// Configuration error during crate initialization.
    ///
    /// Common causes:
    /// - Invalid connection string
    /// - Missing required configuration
    ///
    /// **Recovery:** Fix configuration and restart.
    ConfigError(String),

    /// Operation not supported by this backend.
    ///
    /// Raised by the default `CacheBackend::scan_prefix`, which `clear` needs.
    NotImplemented(String),

    /// Invalid cache entry: corrupted envelope or bad magic.
    ///
    /// Returned when the stored bytes were not written by this crate.
    InvalidCacheEntry(String),

    /// Schema version mismatch between code and cached data.
    VersionMismatch {
        /// Expected schema version (from compiled code)
        expected: u32,
        /// Found schema version (from cached entry)
        found: u32,
    },

    /// Generic error with custom message.
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            Error::DeserializationError(msg) => write!(f, "Deserialization error: {}", msg),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::ColdStartError(key) => {
                write!(f, "No producer provided for cold start on key: {}", key)
            }
            Error::SubmitError(msg) => write!(f, "Rebuild submission rejected: {}", msg),
            Error::DescriptorResolutionError(msg) => {
                write!(f, "Rebuild descriptor not resolvable: {}", msg)
            }
            Error::ComputationError(msg) => write!(f, "Rebuild computation failed: {}", msg),
            Error::ConfigError(msg) => write!(f, "Config error: {}", msg),
            Error::NotImplemented(msg) => write!(f, "Not implemented: {}", msg),
            Error::InvalidCacheEntry(msg) => write!(f, "Invalid cache entry: {}", msg),
            Error::VersionMismatch { expected, found } => {
                write!(
                    f,
                    "Cache version mismatch: expected {}, found {}",
                    expected, found
                )
            }
            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            Error::BackendError(e.to_string())
        } else if e.is_syntax() || e.is_data() || e.is_eof() {
            Error::DeserializationError(e.to_string())
        } else {
            Error::SerializationError(e.to_string())
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::BackendError(e.to_string())
    }
}

impl From<String> for Error {
    fn from(e: String) -> Self {
        Error::Other(e)
    }
}

impl From<&str> for Error {
    fn from(e: &str) -> Self {
        Error::Other(e.to_string())
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for Error {
    fn from(e: redis::RedisError) -> Self {
        Error::BackendError(format!("Redis error: {}", e))
    }
}
