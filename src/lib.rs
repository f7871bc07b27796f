//! # dual-tier-cache
//!
//! A two-generation ("fresh"/"stale") read-through cache with asynchronous
//! refresh-ahead rebuilds.
//!
//! Every write lands in both tiers. The fresh tier expires first; once it has,
//! a read is served from the stale tier immediately while a rebuild job is
//! queued to recompute and republish the value. Only a miss in both tiers
//! computes inline, so expiry never turns into a synchronous recomputation
//! storm.
//!
//! ## Features
//!
//! - **Refresh-ahead:** stale hits return at once and dispatch a rebuild
//! - **Serializable rebuilds:** descriptors name a target instead of capturing a closure
//! - **Versioned keys:** bump a version string to orphan old entries
//! - **Backend Agnostic:** in-memory by default, Redis behind the `redis` feature
//! - **Pluggable job substrate:** in-process tokio queue, or your own `JobQueue`
//!
//! ## Quick Start
//!
//! ```ignore
//! use dual_tier_cache::{
//!     FetchOptions, RebuildDescriptor, RebuildWorker, Store, TargetRegistry,
//!     backend::InMemoryBackend,
//!     queue::TokioQueue,
//! };
//!
//! // 1. Wire the store to a job queue
//! let (queue, jobs) = TokioQueue::bounded(1024);
//! let store = Store::new(InMemoryBackend::new(), queue);
//!
//! // 2. Start a worker that knows how to rebuild "users" values
//! let targets = TargetRegistry::new()
//!     .with_target("users", |request| async move { load_user(&request.key).await });
//! tokio::spawn(RebuildWorker::new(store.writer(), targets).run(jobs));
//!
//! // 3. Fetch: cold start computes inline, stale hits rebuild in the background
//! let options = FetchOptions::default()
//!     .with_rebuilder(RebuildDescriptor::new("users", "load"));
//! let user: User = store.fetch("user:42", options, || load_user("user:42")).await?;
//! ```

#[macro_use]
extern crate log;

pub mod backend;
pub mod descriptor;
pub mod dispatch;
pub mod error;
pub mod key;
pub mod observability;
pub mod queue;
pub mod registry;
pub mod serialization;
pub mod store;
pub mod value;
pub mod worker;

// Re-exports for convenience
pub use backend::CacheBackend;
pub use descriptor::{RebuildDescriptor, RebuildRequest};
pub use dispatch::RebuildDispatcher;
pub use error::{Error, Result};
pub use key::{KeyCodec, Tier};
pub use queue::{JobQueue, JobReceiver, TokioQueue};
pub use registry::RebuilderRegistry;
pub use store::{FetchOptions, Store, StoreConfig, TierWriter};
pub use value::CacheValue;
pub use worker::{RebuildWorker, TargetRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
