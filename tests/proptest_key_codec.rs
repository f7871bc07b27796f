//! Property-based tests for physical key derivation and value encoding.
//!
//! # Properties Tested
//!
//! 1. **Injectivity**: distinct (key, version) pairs never share a physical key
//! 2. **Tier separation**: fresh and stale keys differ for every input
//! 3. **Determinism**: the same input always yields the same key
//! 4. **Namespace scoping**: every key a store produces starts with its prefix
//! 5. **Value roundtrip**: decode(encode(x)) == x for cached records

use dual_tier_cache::key::{KeyCodec, Tier};
use dual_tier_cache::serialization::{CACHE_MAGIC, CURRENT_SCHEMA_VERSION};
use dual_tier_cache::CacheValue;
use proptest::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct Profile {
    id: u64,
    name: String,
    tags: Vec<String>,
    active: bool,
}

/// Keys and versions biased toward the separator characters.
fn arb_segment() -> impl Strategy<Value = String> {
    prop_oneof![
        any::<String>(),
        "[a-z0-9:@]{0,12}",
    ]
}

fn arb_version() -> impl Strategy<Value = Option<String>> {
    prop::option::of(arb_segment())
}

fn arb_profile() -> impl Strategy<Value = Profile> {
    (
        any::<u64>(),
        any::<String>(),
        prop::collection::vec(any::<String>(), 0..8),
        any::<bool>(),
    )
        .prop_map(|(id, name, tags, active)| Profile {
            id,
            name,
            tags,
            active,
        })
}

proptest! {
    #[test]
    fn prop_physical_keys_are_injective(
        key_a in arb_segment(),
        version_a in arb_version(),
        key_b in arb_segment(),
        version_b in arb_version(),
    ) {
        prop_assume!((&key_a, &version_a) != (&key_b, &version_b));
        let codec = KeyCodec::new();

        for tier in [Tier::Fresh, Tier::Stale] {
            prop_assert_ne!(
                codec.physical_key(tier, &key_a, version_a.as_deref()),
                codec.physical_key(tier, &key_b, version_b.as_deref())
            );
        }
    }

    #[test]
    fn prop_tiers_never_collide(
        key_a in arb_segment(),
        version_a in arb_version(),
        key_b in arb_segment(),
        version_b in arb_version(),
    ) {
        let codec = KeyCodec::with_namespace("app");
        let fresh = codec.physical_key(Tier::Fresh, &key_a, version_a.as_deref());
        let stale = codec.physical_key(Tier::Stale, &key_b, version_b.as_deref());
        let marker = codec.rebuild_marker_key(&key_b, version_b.as_deref());

        prop_assert_ne!(&fresh, &stale);
        prop_assert_ne!(&fresh, &marker);
    }

    #[test]
    fn prop_key_derivation_is_deterministic(key in arb_segment(), version in arb_version()) {
        let first = KeyCodec::with_namespace("ns").tier_keys(&key, version.as_deref());
        let second = KeyCodec::with_namespace("ns").tier_keys(&key, version.as_deref());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_keys_live_under_namespace_and_tier_prefix(
        namespace in "[a-z]{1,8}",
        key in arb_segment(),
        version in arb_version(),
    ) {
        let codec = KeyCodec::with_namespace(namespace.as_str());
        let fresh = codec.physical_key(Tier::Fresh, &key, version.as_deref());

        prop_assert!(fresh.starts_with(codec.namespace_prefix()));
        prop_assert!(codec
            .tier_prefixes(Tier::Fresh)
            .iter()
            .any(|prefix| fresh.starts_with(prefix.as_str())));
        prop_assert!(!codec
            .tier_prefixes(Tier::Stale)
            .iter()
            .any(|prefix| fresh.starts_with(prefix.as_str())));
    }

    #[test]
    fn prop_namespaces_never_reach_each_other(
        namespace_a in arb_segment(),
        namespace_b in arb_segment(),
        key in arb_segment(),
        version in arb_version(),
    ) {
        prop_assume!(namespace_a != namespace_b);
        let scanner = KeyCodec::with_namespace(namespace_a.as_str());
        let other = KeyCodec::with_namespace(namespace_b.as_str());

        for tier in [Tier::Fresh, Tier::Stale] {
            let foreign = other.physical_key(tier, &key, version.as_deref());
            for prefix in scanner.tier_prefixes(Tier::Fresh) {
                prop_assert!(!foreign.starts_with(prefix.as_str()));
            }
        }
    }

    #[test]
    fn prop_value_roundtrip(profile in arb_profile()) {
        let bytes = profile.encode().expect("Failed to encode");

        prop_assert_eq!(&bytes[0..4], &CACHE_MAGIC[..]);
        // varint; one byte while the schema version stays below 128
        prop_assert_eq!(u32::from(bytes[4]), CURRENT_SCHEMA_VERSION);

        let decoded = Profile::decode(&bytes).expect("Failed to decode");
        prop_assert_eq!(decoded, profile);
    }
}
