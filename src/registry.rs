//! Instance-owned mapping from logical key to rebuild descriptor.

use crate::descriptor::RebuildDescriptor;
use dashmap::DashMap;
use std::sync::Arc;

/// Concurrent registry consulted on every stale hit.
///
/// Entries are created or overwritten by `fetch` calls that carry a
/// descriptor and never expire on their own. Concurrent `register` calls for
/// one key resolve last-writer-wins. The registry lives as long as the store
/// holding it; clones share the same entries.
#[derive(Clone, Default)]
pub struct RebuilderRegistry {
    entries: Arc<DashMap<String, RebuildDescriptor>>,
}

impl RebuilderRegistry {
    pub fn new() -> Self {
        RebuilderRegistry::default()
    }

    /// Insert or overwrite the descriptor for `key`.
    pub fn register(&self, key: &str, descriptor: RebuildDescriptor) {
        if let Some(previous) = self.entries.insert(key.to_string(), descriptor) {
            debug!(
                "Rebuilder for {} replaced (was {}/{})",
                key, previous.target, previous.operation
            );
        }
    }

    pub fn lookup(&self, key: &str) -> Option<RebuildDescriptor> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Forget the descriptor for `key`, returning it if one was set.
    pub fn unregister(&self, key: &str) -> Option<RebuildDescriptor> {
        self.entries.remove(key).map(|(_, descriptor)| descriptor)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let registry = RebuilderRegistry::new();
        assert!(registry.lookup("user:42").is_none());

        registry.register("user:42", RebuildDescriptor::new("users", "load"));
        assert_eq!(
            registry.lookup("user:42"),
            Some(RebuildDescriptor::new("users", "load"))
        );
    }

    #[test]
    fn test_register_overwrites() {
        let registry = RebuilderRegistry::new();
        registry.register("k", RebuildDescriptor::new("a", "op"));
        registry.register("k", RebuildDescriptor::new("b", "op"));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup("k").map(|d| d.target), Some("b".to_string()));
    }

    #[test]
    fn test_unregister() {
        let registry = RebuilderRegistry::new();
        registry.register("k", RebuildDescriptor::new("a", "op"));

        assert!(registry.unregister("k").is_some());
        assert!(registry.is_empty());
        assert!(registry.unregister("k").is_none());
    }

    #[tokio::test]
    async fn test_concurrent_register() {
        let registry = RebuilderRegistry::new();
        let mut handles = vec![];

        for i in 0..16 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                let key = format!("key_{}", i % 4);
                registry.register(&key, RebuildDescriptor::new(format!("t{}", i), "op"));
                registry.lookup(&key)
            }));
        }

        for handle in handles {
            assert!(handle.await.expect("Task failed").is_some());
        }
        assert_eq!(registry.len(), 4);
    }
}
