//! The dual-tier store: main entry point for cache operations.
//!
//! Every logical key maps to two physical keys, a fresh copy and a stale
//! copy, both written on every `write`. Reads walk the tiers in order:
//!
//! ```text
//! read/fetch(key)
//!   ├─ fresh hit ──────────────────────────────► value
//!   ├─ stale hit ─► dispatch rebuild if a      ► value (stale)
//!   │               descriptor is registered
//!   └─ miss ─┬─ read:  ────────────────────────► None
//!            └─ fetch: producer().await, write ► value
//! ```
//!
//! `delete` and `clear` only touch the fresh tier. A deleted key keeps being
//! served from its stale copy (and keeps triggering rebuilds) until the stale
//! entry expires. Full removal goes through [`Store::backend`] with the keys
//! from [`Store::codec`].
//!
//! Rebuild-path failures (marker bookkeeping, submission) are logged and
//! recorded as metrics errors; they never change what a read returns.

use crate::backend::CacheBackend;
use crate::descriptor::{RebuildDescriptor, RebuildRequest};
use crate::dispatch::RebuildDispatcher;
use crate::error::{Error, Result};
use crate::key::{KeyCodec, Tier};
use crate::observability::{CacheMetrics, NoOpMetrics, TtlPolicy};
use crate::queue::JobQueue;
use crate::registry::RebuilderRegistry;
use crate::value::CacheValue;
use std::future::{Future, Ready};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Setup-time configuration of a [`Store`].
///
/// # Example
///
/// ```
/// use dual_tier_cache::store::StoreConfig;
/// use dual_tier_cache::observability::TtlPolicy;
/// use std::time::Duration;
///
/// let config = StoreConfig::default()
///     .with_namespace("catalog")
///     .with_fresh_ttl(TtlPolicy::Fixed(Duration::from_secs(60)))
///     .with_stale_ttl(TtlPolicy::Fixed(Duration::from_secs(86_400)))
///     .with_rebuild_lock(Duration::from_secs(30));
/// assert_eq!(config.namespace.as_deref(), Some("catalog"));
/// ```
#[derive(Clone, Debug, Default)]
pub struct StoreConfig {
    /// Prefix for every physical key this store touches. `clear` is scoped to it.
    pub namespace: Option<String>,

    /// TTL applied to fresh-tier writes.
    pub fresh_ttl: TtlPolicy,

    /// TTL applied to stale-tier writes.
    pub stale_ttl: TtlPolicy,

    /// Enables rebuild de-duplication.
    ///
    /// When set, a stale hit writes a marker key with this TTL before
    /// dispatching, and skips dispatch while the marker exists. The worker
    /// removes the marker after a successful rebuild; a failed rebuild leaves
    /// it until it expires. The check and the set are two separate backend
    /// calls, so two racing readers can still both dispatch.
    ///
    /// `None` (default): every qualifying stale hit dispatches.
    pub rebuild_lock_ttl: Option<Duration>,
}

impl StoreConfig {
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_fresh_ttl(mut self, policy: TtlPolicy) -> Self {
        self.fresh_ttl = policy;
        self
    }

    pub fn with_stale_ttl(mut self, policy: TtlPolicy) -> Self {
        self.stale_ttl = policy;
        self
    }

    pub fn with_rebuild_lock(mut self, ttl: Duration) -> Self {
        self.rebuild_lock_ttl = Some(ttl);
        self
    }
}

/// Per-call options for [`Store::fetch`].
///
/// # Example
///
/// ```ignore
/// let options = FetchOptions::default()
///     .with_version("v2")
///     .with_rebuilder(RebuildDescriptor::new("users", "load_profile"))
///     .with_ttl(Duration::from_secs(30));
///
/// let user: User = store.fetch("user:42", options, || load_user(42)).await?;
/// ```
#[derive(Clone, Debug, Default)]
pub struct FetchOptions {
    /// Folded into both physical keys; changing it orphans older entries.
    pub version: Option<String>,

    /// Registered for the key before lookup; later stale hits rebuild through it.
    pub rebuilder: Option<RebuildDescriptor>,

    /// TTL for both tiers of a cold-start write, replacing the store policies.
    pub ttl_override: Option<Duration>,
}

impl FetchOptions {
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_rebuilder(mut self, descriptor: RebuildDescriptor) -> Self {
        self.rebuilder = Some(descriptor);
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_override = Some(ttl);
        self
    }
}

/// The write half of a store: backend, key codec, TTL policies and metrics.
///
/// Handed to [`crate::worker::RebuildWorker`] so rebuilt values are published
/// exactly like `Store::write` publishes them, without the worker holding a
/// handle on the job queue it drains.
#[derive(Clone)]
pub struct TierWriter<B: CacheBackend> {
    backend: B,
    codec: KeyCodec,
    config: Arc<StoreConfig>,
    metrics: Arc<dyn CacheMetrics>,
}

impl<B: CacheBackend> TierWriter<B> {
    /// Write already-encoded bytes to the fresh tier, then the stale tier.
    ///
    /// The two sets are not atomic; a failure in between leaves only the
    /// fresh copy updated.
    ///
    /// # Errors
    /// Returns `Error::BackendError` from the first failing set.
    pub async fn write_encoded(
        &self,
        key: &str,
        bytes: Vec<u8>,
        version: Option<&str>,
        ttl_override: Option<Duration>,
    ) -> Result<()> {
        let timer = Instant::now();
        let (fresh_key, stale_key) = self.codec.tier_keys(key, version);
        let fresh_ttl = ttl_override.or_else(|| self.config.fresh_ttl.get_ttl(key));
        let stale_ttl = ttl_override.or_else(|| self.config.stale_ttl.get_ttl(key));

        self.backend.set(&fresh_key, bytes.clone(), fresh_ttl).await?;
        self.backend.set(&stale_key, bytes, stale_ttl).await?;

        self.metrics.record_set(key, timer.elapsed());
        Ok(())
    }

    /// Remove the in-flight marker after a completed rebuild.
    pub async fn release_rebuild_marker(&self, key: &str, version: Option<&str>) {
        if self.config.rebuild_lock_ttl.is_none() {
            return;
        }

        let marker = self.codec.rebuild_marker_key(key, version);
        if let Err(e) = self.backend.delete(&marker).await {
            warn!("Failed to release rebuild marker {}: {}", marker, e);
            self.metrics.record_error(key, &e.to_string());
        }
    }

    pub fn metrics(&self) -> &dyn CacheMetrics {
        self.metrics.as_ref()
    }
}

/// Outcome of walking both tiers for one key.
enum Lookup {
    Hit(Tier, Vec<u8>),
    Miss,
}

type NoProducer<T> = fn() -> Ready<Result<T>>;

/// Two-generation read-through cache with refresh-ahead rebuilds.
///
/// Cloning is cheap and clones share the backend, the rebuilder registry and
/// the job queue.
///
/// # Example
///
/// ```ignore
/// use dual_tier_cache::{Store, FetchOptions, RebuildDescriptor};
/// use dual_tier_cache::backend::InMemoryBackend;
/// use dual_tier_cache::queue::TokioQueue;
///
/// let (queue, jobs) = TokioQueue::bounded(1024);
/// let store = Store::new(InMemoryBackend::new(), queue);
///
/// let options = FetchOptions::default()
///     .with_rebuilder(RebuildDescriptor::new("users", "load_profile"));
/// let user: User = store.fetch("user:42", options, || load_user(42)).await?;
/// ```
#[derive(Clone)]
pub struct Store<B: CacheBackend, Q: JobQueue> {
    writer: TierWriter<B>,
    dispatcher: RebuildDispatcher<Q>,
    registry: RebuilderRegistry,
}

impl<B: CacheBackend, Q: JobQueue> Store<B, Q> {
    /// Create a store with default configuration and an empty registry.
    pub fn new(backend: B, queue: Q) -> Self {
        Self::with_config(backend, queue, StoreConfig::default())
    }

    /// Create a store with explicit configuration.
    pub fn with_config(backend: B, queue: Q, config: StoreConfig) -> Self {
        let codec = match &config.namespace {
            Some(namespace) => KeyCodec::with_namespace(namespace.as_str()),
            None => KeyCodec::new(),
        };

        Store {
            writer: TierWriter {
                backend,
                codec,
                config: Arc::new(config),
                metrics: Arc::new(NoOpMetrics),
            },
            dispatcher: RebuildDispatcher::new(queue),
            registry: RebuilderRegistry::new(),
        }
    }

    /// Use an existing rebuilder registry instead of a fresh one.
    pub fn with_registry(mut self, registry: RebuilderRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Set custom metrics handler.
    pub fn with_metrics(mut self, metrics: Arc<dyn CacheMetrics>) -> Self {
        self.writer.metrics = metrics;
        self
    }

    /// Read without ever computing.
    ///
    /// Fresh hit returns the fresh value. Stale-only hit returns the stale
    /// value and dispatches a rebuild if a descriptor is registered for `key`.
    ///
    /// # Errors
    ///
    /// - `Error::BackendError`: Backend unavailable
    /// - `Error::InvalidCacheEntry` / `Error::VersionMismatch` /
    ///   `Error::DeserializationError`: Stored bytes do not decode as `T`
    pub async fn read<T: CacheValue>(&self, key: &str, version: Option<&str>) -> Result<Option<T>> {
        let result = self.read_inner(key, version).await;
        self.observe(key, result)
    }

    async fn read_inner<T: CacheValue>(
        &self,
        key: &str,
        version: Option<&str>,
    ) -> Result<Option<T>> {
        let timer = Instant::now();

        match self.lookup(key, version).await? {
            Lookup::Hit(tier, bytes) => {
                self.writer.metrics.record_hit(key, tier, timer.elapsed());
                T::decode(&bytes).map(Some)
            }
            Lookup::Miss => {
                self.writer.metrics.record_miss(key, timer.elapsed());
                Ok(None)
            }
        }
    }

    /// Write `value` to both tiers using the store TTL policies.
    ///
    /// # Errors
    ///
    /// - `Error::SerializationError`: `value` cannot be encoded
    /// - `Error::BackendError`: Backend unavailable
    pub async fn write<T: CacheValue>(
        &self,
        key: &str,
        value: &T,
        version: Option<&str>,
    ) -> Result<()> {
        self.write_with_ttl(key, value, version, None).await
    }

    /// Write `value` to both tiers, `ttl` overriding the store policies when set.
    ///
    /// # Errors
    ///
    /// Same as [`Store::write`].
    pub async fn write_with_ttl<T: CacheValue>(
        &self,
        key: &str,
        value: &T,
        version: Option<&str>,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let result = match value.encode() {
            Ok(bytes) => self.writer.write_encoded(key, bytes, version, ttl).await,
            Err(e) => Err(e),
        };
        self.observe(key, result)
    }

    /// Read-through with refresh-ahead.
    ///
    /// Registers `options.rebuilder` (if any), then behaves like [`Store::read`].
    /// On a miss in both tiers, awaits `producer` inline, writes the result to
    /// both tiers and returns it. Concurrent cold misses for one key each run
    /// their producer; the last write wins.
    ///
    /// # Errors
    ///
    /// - Any error from [`Store::read`] or [`Store::write`]
    /// - Whatever `producer` returns, unchanged
    pub async fn fetch<T, F, Fut>(&self, key: &str, options: FetchOptions, producer: F) -> Result<T>
    where
        T: CacheValue,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let result = self.fetch_inner(key, options, Some(producer)).await;
        self.observe(key, result)
    }

    /// [`Store::fetch`] without a producer.
    ///
    /// # Errors
    ///
    /// Returns `Error::ColdStartError` when neither tier holds `key`.
    pub async fn fetch_cached<T: CacheValue>(&self, key: &str, options: FetchOptions) -> Result<T> {
        let result = self
            .fetch_inner::<T, NoProducer<T>, Ready<Result<T>>>(key, options, None)
            .await;
        self.observe(key, result)
    }

    async fn fetch_inner<T, F, Fut>(
        &self,
        key: &str,
        options: FetchOptions,
        producer: Option<F>,
    ) -> Result<T>
    where
        T: CacheValue,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let timer = Instant::now();
        let FetchOptions {
            version,
            rebuilder,
            ttl_override,
        } = options;
        let version = version.as_deref();

        if let Some(descriptor) = rebuilder {
            self.registry.register(key, descriptor);
        }

        debug!("» Fetch for key: {} (version: {:?})", key, version);

        if let Lookup::Hit(tier, bytes) = self.lookup(key, version).await? {
            self.writer.metrics.record_hit(key, tier, timer.elapsed());
            return T::decode(&bytes);
        }

        self.writer.metrics.record_miss(key, timer.elapsed());

        let Some(producer) = producer else {
            return Err(Error::ColdStartError(key.to_string()));
        };

        debug!("Cold start for {}, computing inline", key);
        let value = producer().await?;
        self.writer
            .write_encoded(key, value.encode()?, version, ttl_override)
            .await?;

        info!("✓ Cold start for {} computed in {:?}", key, timer.elapsed());
        Ok(value)
    }

    /// Remove the fresh copy of `key`. The stale copy is left in place.
    ///
    /// # Errors
    /// Returns `Error::BackendError` if backend error occurs
    pub async fn delete(&self, key: &str, version: Option<&str>) -> Result<()> {
        let timer = Instant::now();
        let fresh_key = self.writer.codec.physical_key(Tier::Fresh, key, version);

        let result = self.writer.backend.delete(&fresh_key).await;
        if result.is_ok() {
            self.writer.metrics.record_delete(key, timer.elapsed());
        }
        self.observe(key, result)
    }

    /// True if either tier holds `key`.
    ///
    /// # Errors
    /// Returns `Error::BackendError` if backend error occurs
    pub async fn exists(&self, key: &str, version: Option<&str>) -> Result<bool> {
        let (fresh_key, stale_key) = self.writer.codec.tier_keys(key, version);

        let result = match self.writer.backend.exists(&fresh_key).await {
            Ok(true) => Ok(true),
            Ok(false) => self.writer.backend.exists(&stale_key).await,
            Err(e) => Err(e),
        };
        self.observe(key, result)
    }

    /// Delete every fresh-tier key in this store's namespace.
    ///
    /// Stale entries stay readable. Without a namespace, this covers every
    /// fresh-tier key on the backend. Returns the number of keys removed.
    ///
    /// # Errors
    ///
    /// - `Error::NotImplemented`: Backend cannot scan by prefix
    /// - `Error::BackendError`: Backend unavailable
    pub async fn clear(&self) -> Result<usize> {
        let mut removed = 0;

        for prefix in self.writer.codec.tier_prefixes(Tier::Fresh) {
            let keys = self.writer.backend.scan_prefix(&prefix).await?;
            if keys.is_empty() {
                continue;
            }

            let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
            self.writer.backend.mdelete(&refs).await?;
            removed += keys.len();
        }

        info!(
            "✓ Cleared {} fresh-tier keys under '{}'",
            removed,
            self.writer.codec.namespace_prefix()
        );
        Ok(removed)
    }

    /// Health check of the underlying backend.
    ///
    /// # Errors
    /// Returns `Err` if backend is not accessible
    pub async fn health_check(&self) -> Result<bool> {
        self.writer.backend.health_check().await
    }

    /// Write half, for wiring a [`crate::worker::RebuildWorker`].
    pub fn writer(&self) -> TierWriter<B> {
        self.writer.clone()
    }

    /// Get backend reference (for advanced use).
    pub fn backend(&self) -> &B {
        &self.writer.backend
    }

    pub fn codec(&self) -> &KeyCodec {
        &self.writer.codec
    }

    pub fn registry(&self) -> &RebuilderRegistry {
        &self.registry
    }

    pub fn config(&self) -> &StoreConfig {
        &self.writer.config
    }

    async fn lookup(&self, key: &str, version: Option<&str>) -> Result<Lookup> {
        let (fresh_key, stale_key) = self.writer.codec.tier_keys(key, version);

        if let Some(bytes) = self.writer.backend.get(&fresh_key).await? {
            debug!("✓ Fresh hit for {}", fresh_key);
            return Ok(Lookup::Hit(Tier::Fresh, bytes));
        }

        if let Some(bytes) = self.writer.backend.get(&stale_key).await? {
            debug!("Stale hit for {}", stale_key);
            self.schedule_rebuild(key, version).await;
            return Ok(Lookup::Hit(Tier::Stale, bytes));
        }

        debug!("✗ Miss in both tiers for {}", key);
        Ok(Lookup::Miss)
    }

    /// Dispatch a rebuild for a stale hit. Never fails the caller.
    async fn schedule_rebuild(&self, key: &str, version: Option<&str>) {
        let Some(descriptor) = self.registry.lookup(key) else {
            debug!("No rebuilder registered for {}, serving stale value", key);
            return;
        };

        let marker = match self.writer.config.rebuild_lock_ttl {
            Some(lock_ttl) => match self.acquire_rebuild_marker(key, version, lock_ttl).await {
                Some(marker) => Some(marker),
                None => return,
            },
            None => None,
        };

        let request = RebuildRequest::new(key, version.map(str::to_string), descriptor);
        match self.dispatcher.dispatch(&request).await {
            Ok(()) => self.writer.metrics.record_rebuild_dispatched(key),
            Err(e) => {
                warn!("Rebuild dispatch for {} failed, serving stale value: {}", key, e);
                self.writer.metrics.record_error(key, &e.to_string());

                // Nothing will run, so let the next stale hit try again.
                if marker.is_some() {
                    self.writer.release_rebuild_marker(key, version).await;
                }
            }
        }
    }

    /// Returns the marker key when this caller should dispatch, `None` when a
    /// rebuild is already in flight. Backend failures fall through to dispatch.
    async fn acquire_rebuild_marker(
        &self,
        key: &str,
        version: Option<&str>,
        lock_ttl: Duration,
    ) -> Option<String> {
        let marker = self.writer.codec.rebuild_marker_key(key, version);

        match self.writer.backend.exists(&marker).await {
            Ok(true) => {
                debug!("Rebuild already in flight for {}, skipping dispatch", key);
                return None;
            }
            Ok(false) => {}
            Err(e) => {
                warn!("Rebuild marker check failed for {}: {}", key, e);
                self.writer.metrics.record_error(key, &e.to_string());
                return Some(marker);
            }
        }

        if let Err(e) = self.writer.backend.set(&marker, Vec::new(), Some(lock_ttl)).await {
            warn!("Failed to set rebuild marker for {}: {}", key, e);
            self.writer.metrics.record_error(key, &e.to_string());
        }
        Some(marker)
    }

    fn observe<T>(&self, key: &str, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            self.writer.metrics.record_error(key, &e.to_string());
        }
        result
    }
}
