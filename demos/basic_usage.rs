//! Basic usage example of the dual-tier cache.
//!
//! Walks one key through its life: cold start, fresh hit, fresh expiry,
//! stale hit with a background rebuild, and the refreshed value.

use dual_tier_cache::{
    backend::InMemoryBackend, error::Result, observability::TtlPolicy, queue::TokioQueue,
    FetchOptions, RebuildDescriptor, RebuildRequest, RebuildWorker, Store, StoreConfig,
    TargetRegistry,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Example value: an exchange rate quote
#[derive(Clone, Serialize, Deserialize, Debug)]
struct Quote {
    pair: String,
    rate: f64,
    revision: u32,
}

/// Mock upstream that returns a new revision on every call
#[derive(Clone, Default)]
struct RateService {
    revisions: Arc<AtomicU32>,
}

impl RateService {
    async fn load(&self, pair: &str) -> Result<Quote> {
        let revision = self.revisions.fetch_add(1, Ordering::SeqCst) + 1;
        println!("  [UPSTREAM] Loading {} (revision {})", pair, revision);
        tokio::time::sleep(Duration::from_millis(50)).await;

        Ok(Quote {
            pair: pair.to_string(),
            rate: 1.08 + f64::from(revision) / 1000.0,
            revision,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Debug)
        .try_init()
        .ok();

    println!("\n=== Dual-Tier Cache - Basic Example ===\n");

    // 1. Store: short fresh tier, long stale tier
    println!("1. Initializing store and rebuild worker...");
    let (queue, jobs) = TokioQueue::bounded(128);
    let store = Store::with_config(
        InMemoryBackend::new(),
        queue,
        StoreConfig::default()
            .with_namespace("fx")
            .with_fresh_ttl(TtlPolicy::Fixed(Duration::from_millis(500)))
            .with_stale_ttl(TtlPolicy::Fixed(Duration::from_secs(3600)))
            .with_rebuild_lock(Duration::from_secs(10)),
    );

    // 2. Worker: resolves the "rates" target named by the descriptor
    let service = RateService::default();
    let upstream = service.clone();
    let targets = TargetRegistry::new().with_target("rates", move |request: RebuildRequest| {
        let upstream = upstream.clone();
        async move { upstream.load(&request.key).await }
    });
    let worker = tokio::spawn(RebuildWorker::new(store.writer(), targets).run(jobs));
    println!("   ✓ Store and worker ready\n");

    let options = FetchOptions::default().with_rebuilder(RebuildDescriptor::new("rates", "load"));

    // 3. Cold start: computed inline
    println!("2. First fetch (cold start):");
    let quote: Quote = store
        .fetch("EUR/USD", options.clone(), || service.load("EUR/USD"))
        .await?;
    println!("   ✓ {} = {:.4} (revision {})\n", quote.pair, quote.rate, quote.revision);

    // 4. Fresh hit: producer not called
    println!("3. Second fetch (fresh hit):");
    let quote: Quote = store
        .fetch("EUR/USD", options.clone(), || service.load("EUR/USD"))
        .await?;
    println!("   ✓ revision {} served from cache\n", quote.revision);

    // 5. Let the fresh copy expire
    println!("4. Waiting for the fresh tier to expire...");
    tokio::time::sleep(Duration::from_millis(600)).await;

    let quote: Quote = store.fetch_cached("EUR/USD", options.clone()).await?;
    println!(
        "   ✓ Stale revision {} returned immediately, rebuild queued\n",
        quote.revision
    );

    // 6. The worker republished the value
    tokio::time::sleep(Duration::from_millis(200)).await;
    println!("5. Fetch after the rebuild:");
    let quote: Quote = store.fetch_cached("EUR/USD", options.clone()).await?;
    println!("   ✓ Refreshed revision {}\n", quote.revision);

    // 7. Versioned keys: a new version starts cold
    println!("6. Fetch under a new version:");
    let quote: Quote = store
        .fetch(
            "EUR/USD",
            options.with_version("v2"),
            || service.load("EUR/USD"),
        )
        .await?;
    println!("   ✓ v2 computed inline (revision {})\n", quote.revision);

    // Dropping the last store handle closes the queue and stops the worker
    drop(store);
    worker
        .await
        .map_err(|e| dual_tier_cache::Error::Other(e.to_string()))?;

    println!("=== Example completed ===\n");
    Ok(())
}
