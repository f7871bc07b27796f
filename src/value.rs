//! Trait for values stored in the cache.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Any value the store can hold in its two tiers.
///
/// The cache never interprets values; it only encodes them through
/// [`crate::serialization`]. Implemented for every owned serde type.
///
/// # Example
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use dual_tier_cache::CacheValue;
///
/// #[derive(Serialize, Deserialize, PartialEq, Debug)]
/// struct User {
///     id: u64,
/// }
///
/// let bytes = User { id: 42 }.encode().unwrap();
/// assert_eq!(User::decode(&bytes).unwrap(), User { id: 42 });
/// ```
pub trait CacheValue: Serialize + DeserializeOwned + Send + Sync {
    /// Encode into the versioned envelope written to both tiers.
    ///
    /// # Errors
    ///
    /// Returns `Error::SerializationError` for values with no JSON form.
    fn encode(&self) -> Result<Vec<u8>> {
        crate::serialization::serialize_for_cache(self)
    }

    /// Decode bytes read from either tier.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidCacheEntry`: Bad magic or corrupted envelope
    /// - `Error::VersionMismatch`: Schema version changed
    /// - `Error::DeserializationError`: Corrupted payload
    fn decode(bytes: &[u8]) -> Result<Self> {
        crate::serialization::deserialize_from_cache(bytes)
    }
}

impl<T> CacheValue for T where T: Serialize + DeserializeOwned + Send + Sync {}
