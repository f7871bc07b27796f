//! Metrics hooks and TTL policies for the store.
//!
//! # Metrics
//!
//! Implement [`CacheMetrics`] to feed your monitoring system. Every hook has a
//! default that logs through the `log` crate, so an empty impl is a valid
//! logging-only collector. [`NoOpMetrics`] (the store default) discards all
//! events.
//!
//! ```ignore
//! use dual_tier_cache::observability::CacheMetrics;
//! use dual_tier_cache::key::Tier;
//! use std::time::Duration;
//!
//! struct PrometheusMetrics;
//!
//! impl CacheMetrics for PrometheusMetrics {
//!     fn record_hit(&self, _key: &str, tier: Tier, _duration: Duration) {
//!         // counter!("cache_hits", "tier" => tier.to_string()).inc();
//!     }
//! }
//! ```
//!
//! # TTL Policies
//!
//! The store holds one policy per tier. The stale tier normally outlives the
//! fresh tier by a wide margin, which is what leaves a stale value to serve
//! while a rebuild runs:
//!
//! ```
//! use dual_tier_cache::observability::TtlPolicy;
//! use std::time::Duration;
//!
//! let fresh = TtlPolicy::Fixed(Duration::from_secs(60));
//! let stale = TtlPolicy::PerKey(|key| {
//!     if key.starts_with("session:") {
//!         Duration::from_secs(1800)
//!     } else {
//!         Duration::from_secs(86_400)
//!     }
//! });
//! assert_eq!(stale.get_ttl("session:1"), Some(Duration::from_secs(1800)));
//! # let _ = fresh;
//! ```

use crate::key::Tier;
use std::time::Duration;

/// Trait for cache metrics collection.
pub trait CacheMetrics: Send + Sync {
    /// Record a hit served from `tier`.
    fn record_hit(&self, key: &str, tier: Tier, duration: Duration) {
        debug!("Cache HIT ({}): {} took {:?}", tier, key, duration);
    }

    /// Record a miss in both tiers.
    fn record_miss(&self, key: &str, duration: Duration) {
        debug!("Cache MISS: {} took {:?}", key, duration);
    }

    /// Record a two-tier write.
    fn record_set(&self, key: &str, duration: Duration) {
        debug!("Cache SET: {} took {:?}", key, duration);
    }

    /// Record a fresh-tier delete.
    fn record_delete(&self, key: &str, duration: Duration) {
        debug!("Cache DELETE: {} took {:?}", key, duration);
    }

    /// Record a rebuild request handed to the job substrate.
    fn record_rebuild_dispatched(&self, key: &str) {
        debug!("Cache REBUILD dispatched: {}", key);
    }

    /// Record an error.
    fn record_error(&self, key: &str, error: &str) {
        warn!("Cache ERROR for {}: {}", key, error);
    }
}

/// Default metrics implementation (no-op).
#[derive(Clone, Default)]
pub struct NoOpMetrics;

impl CacheMetrics for NoOpMetrics {
    fn record_hit(&self, _key: &str, _tier: Tier, _duration: Duration) {}
    fn record_miss(&self, _key: &str, _duration: Duration) {}
    fn record_set(&self, _key: &str, _duration: Duration) {}
    fn record_delete(&self, _key: &str, _duration: Duration) {}
    fn record_rebuild_dispatched(&self, _key: &str) {}
    fn record_error(&self, _key: &str, _error: &str) {}
}

/// TTL (Time-to-Live) policy for one tier.
#[derive(Clone, Debug, Default)]
pub enum TtlPolicy {
    /// Use backend's default TTL
    #[default]
    Default,

    /// Fixed duration for all entries
    Fixed(Duration),

    /// No TTL (entries live until deleted)
    Infinite,

    /// Duration chosen from the logical key
    PerKey(fn(&str) -> Duration),
}

impl TtlPolicy {
    /// Get TTL for a logical key.
    pub fn get_ttl(&self, key: &str) -> Option<Duration> {
        match self {
            TtlPolicy::Default => None,
            TtlPolicy::Fixed(d) => Some(*d),
            TtlPolicy::Infinite => None,
            TtlPolicy::PerKey(f) => Some(f(key)),
        }
    }
}
