//! Rebuild worker: turns queued rebuild requests back into cached values.
//!
//! The worker runs wherever the job substrate delivers jobs. For each job it
//! decodes the [`RebuildRequest`], resolves its descriptor against a
//! [`TargetRegistry`], awaits the target and publishes the result through the
//! store's write path. Each job gets exactly one attempt: failures are logged
//! and recorded, never retried, and never reach the readers who triggered the
//! rebuild (they already got the stale value).

use crate::backend::CacheBackend;
use crate::descriptor::RebuildRequest;
use crate::error::{Error, Result};
use crate::queue::JobReceiver;
use crate::store::TierWriter;
use crate::value::CacheValue;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

type BoxedTarget = Box<dyn Fn(RebuildRequest) -> BoxFuture<'static, Result<Vec<u8>>> + Send + Sync>;

/// Named recomputation handlers, keyed by `RebuildDescriptor::target`.
///
/// Handlers receive the whole request (key, version, operation, args) and
/// return the value to cache.
///
/// # Example
///
/// ```ignore
/// let targets = TargetRegistry::new().with_target("users", |request| async move {
///     match request.descriptor.operation.as_str() {
///         "load_profile" => load_profile(&request.key).await,
///         other => Err(Error::ComputationError(format!("unknown operation {}", other))),
///     }
/// });
/// ```
#[derive(Default)]
pub struct TargetRegistry {
    targets: HashMap<String, BoxedTarget>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        TargetRegistry::default()
    }

    /// Register (or replace) the handler for `name`.
    pub fn register<F, Fut, T>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(RebuildRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: CacheValue + 'static,
    {
        let boxed: BoxedTarget = Box::new(move |request| {
            let computation = handler(request);
            async move { computation.await?.encode() }.boxed()
        });
        self.targets.insert(name.into(), boxed);
    }

    /// Builder form of [`TargetRegistry::register`].
    pub fn with_target<F, Fut, T>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(RebuildRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: CacheValue + 'static,
    {
        self.register(name, handler);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.targets.contains_key(name)
    }

    fn resolve(&self, request: &RebuildRequest) -> Result<&BoxedTarget> {
        self.targets.get(&request.descriptor.target).ok_or_else(|| {
            Error::DescriptorResolutionError(format!(
                "no rebuild target named '{}' (key {})",
                request.descriptor.target, request.key
            ))
        })
    }
}

/// Executes rebuild jobs against a store's write path.
pub struct RebuildWorker<B: CacheBackend> {
    writer: TierWriter<B>,
    targets: Arc<TargetRegistry>,
}

impl<B: CacheBackend> Clone for RebuildWorker<B> {
    fn clone(&self) -> Self {
        RebuildWorker {
            writer: self.writer.clone(),
            targets: Arc::clone(&self.targets),
        }
    }
}

impl<B: CacheBackend> RebuildWorker<B> {
    /// Create a worker publishing through `writer` (see `Store::writer`).
    pub fn new(writer: TierWriter<B>, targets: TargetRegistry) -> Self {
        RebuildWorker {
            writer,
            targets: Arc::new(targets),
        }
    }

    /// Run one job and report the outcome.
    ///
    /// # Errors
    ///
    /// - `Error::DescriptorResolutionError`: Undecodable job or unknown target
    /// - `Error::ComputationError`: The target failed
    /// - `Error::BackendError` / `Error::SerializationError`: Publishing failed
    pub async fn handle(&self, job: &[u8]) -> Result<()> {
        let request = RebuildRequest::decode(job).map_err(|e| {
            Error::DescriptorResolutionError(format!("undecodable rebuild job: {}", e))
        })?;
        self.rebuild(request).await
    }

    /// Resolve, compute and publish one request.
    ///
    /// # Errors
    ///
    /// Same as [`RebuildWorker::handle`], minus decoding.
    pub async fn rebuild(&self, request: RebuildRequest) -> Result<()> {
        let timer = Instant::now();
        let key = request.key.clone();
        let version = request.version.clone();
        let label = format!(
            "{}/{}",
            request.descriptor.target, request.descriptor.operation
        );

        let target = self.targets.resolve(&request)?;
        let bytes = target(request).await.map_err(|e| match e {
            Error::ComputationError(_) | Error::SerializationError(_) => e,
            other => Error::ComputationError(other.to_string()),
        })?;

        self.writer
            .write_encoded(&key, bytes, version.as_deref(), None)
            .await?;
        self.writer
            .release_rebuild_marker(&key, version.as_deref())
            .await;

        info!("✓ Rebuilt {} via {} in {:?}", key, label, timer.elapsed());
        Ok(())
    }

    /// Run one job, logging instead of returning failures. Never retries.
    pub async fn perform(&self, job: &[u8]) {
        if let Err(e) = self.handle(job).await {
            let key = RebuildRequest::decode(job)
                .map(|request| request.key)
                .unwrap_or_else(|_| "<undecodable>".to_string());
            error!("Rebuild of {} failed, stale value kept: {}", key, e);
            self.writer.metrics().record_error(&key, &e.to_string());
        }
    }

    /// Drain `receiver` until every queue sender (every store clone) is dropped.
    ///
    /// Jobs run one at a time in arrival order. Spawn the returned future on
    /// the runtime that should host rebuilds.
    pub async fn run(self, mut receiver: JobReceiver) {
        info!("Rebuild worker started");
        while let Some(job) = receiver.recv().await {
            self.perform(&job).await;
        }
        info!("Rebuild worker stopped: queue closed");
    }
}
