//! Physical key derivation for the fresh and stale tiers.
//!
//! Key layout (namespace prefix only when configured):
//!
//! ```text
//! unversioned:  {len(ns)}:{ns}:{tag}:{key}
//! versioned:    {len(ns)}:{ns}:{tag}@{len(version)}:{version}:{key}
//! ```
//!
//! Tags are `r1` (fresh), `r2` (stale) and `rb` (rebuild in-flight marker).
//! The length prefixes keep the mapping injective even when keys or versions
//! contain `:` or `@`. Namespaced keys start with a digit and un-namespaced
//! keys with `r`, and no namespace prefix is a prefix of another, so a tier
//! scan in one namespace never reaches keys of another.

/// One of the two cache generations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Primary generation, read first.
    Fresh,
    /// Fallback generation, served while a rebuild runs.
    Stale,
}

impl Tier {
    /// Short tag embedded in the physical key.
    pub fn tag(self) -> &'static str {
        match self {
            Tier::Fresh => "r1",
            Tier::Stale => "r2",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Fresh => write!(f, "fresh"),
            Tier::Stale => write!(f, "stale"),
        }
    }
}

const REBUILD_MARKER_TAG: &str = "rb";

/// Derives physical keys from `(tier, logical key, version)`.
///
/// Pure and deterministic; cloning is cheap enough to hand one to every store.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyCodec {
    prefix: String,
}

impl KeyCodec {
    /// Codec without a namespace.
    pub fn new() -> Self {
        KeyCodec::default()
    }

    /// Codec whose keys all start with `"{len(namespace)}:{namespace}:"`.
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        if namespace.is_empty() {
            return KeyCodec::default();
        }
        KeyCodec {
            prefix: format!("{}:{}:", namespace.len(), namespace),
        }
    }

    /// Namespace prefix including its trailing `:`, empty when unset.
    pub fn namespace_prefix(&self) -> &str {
        &self.prefix
    }

    /// Physical key for one tier.
    pub fn physical_key(&self, tier: Tier, key: &str, version: Option<&str>) -> String {
        self.encode(tier.tag(), key, version)
    }

    /// Both physical keys, fresh first.
    pub fn tier_keys(&self, key: &str, version: Option<&str>) -> (String, String) {
        (
            self.physical_key(Tier::Fresh, key, version),
            self.physical_key(Tier::Stale, key, version),
        )
    }

    /// Key of the short-lived "rebuild in progress" marker.
    pub fn rebuild_marker_key(&self, key: &str, version: Option<&str>) -> String {
        self.encode(REBUILD_MARKER_TAG, key, version)
    }

    /// Prefixes covering every key of `tier` in this namespace, versioned or not.
    pub fn tier_prefixes(&self, tier: Tier) -> [String; 2] {
        [
            format!("{}{}:", self.prefix, tier.tag()),
            format!("{}{}@", self.prefix, tier.tag()),
        ]
    }

    fn encode(&self, tag: &str, key: &str, version: Option<&str>) -> String {
        match version {
            Some(v) => format!("{}{}@{}:{}:{}", self.prefix, tag, v.len(), v, key),
            None => format!("{}{}:{}", self.prefix, tag, key),
        }
    }
}
