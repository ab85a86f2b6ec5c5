//! `kiosko preload`: warm modules into the cache.

use anyhow::Result;
use kiosko_preload::CacheStats;
use serde::Serialize;
use std::time::Duration;

use super::Session;
use crate::output;

#[derive(Debug, Serialize)]
struct PreloadSummary {
    requested: Vec<String>,
    cached: Vec<String>,
    missing: Vec<String>,
    cache: CacheStats,
}

/// Requests every module at once; requests over the concurrency limit are
/// queued by the preloader and drained while waiting `settle_ms`.
pub async fn execute(session: &Session, modules: &[String], settle_ms: u64) -> Result<()> {
    let (runtime, _) = session.runtime()?;
    let preloader = runtime.preloader();

    let handles: Vec<_> = modules
        .iter()
        .map(|module| {
            let preloader = preloader.clone();
            let module = module.clone();
            tokio::spawn(async move { preloader.preload_module(&module).await })
        })
        .collect();
    for handle in handles {
        handle.await?;
    }

    if settle_ms > 0 {
        tokio::time::sleep(Duration::from_millis(settle_ms)).await;
    }

    let mut cached = Vec::new();
    let mut missing = Vec::new();
    for module in modules {
        if preloader.is_cached(module).await {
            cached.push(module.clone());
        } else {
            missing.push(module.clone());
        }
    }
    let cache = preloader.get_cache_stats().await;

    if session.json {
        output::print_json(&PreloadSummary { requested: modules.to_vec(), cached, missing, cache })?;
    } else {
        output::section("Preload");
        for module in &cached {
            output::success(module, "cached");
        }
        for module in &missing {
            output::failure(module, "not cached");
        }
        output::cache_summary(&cache);
    }
    Ok(())
}
