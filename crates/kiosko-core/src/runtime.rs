//! Composition root.

use kiosko_abstraction::{ActivityGauge, AssetFetcher, IdleScheduler, ModuleDocument};
use kiosko_loader::{LoadOptions, LoadOutcome, LoadStats, ModuleConfig, ModuleManager};
use kiosko_preload::{ActivityIdleScheduler, CacheStats, FixedDelayIdle, ModulePreloader};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::KioskoConfig;
use crate::error::Result;
use crate::fs::FsAssetFetcher;
use crate::http::HttpAssetFetcher;

/// Combined diagnostic snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct RuntimeStats {
    pub loader: LoadStats,
    pub cache: CacheStats,
}

/// Owns the single preloader and module manager of a process.
///
/// The manager reads markup through the preloader, and background preloads
/// wait for foreground loads to finish unless idle detection is disabled.
#[derive(Debug)]
pub struct ModuleRuntime {
    config: KioskoConfig,
    preloader: ModulePreloader,
    manager: ModuleManager,
}

impl ModuleRuntime {
    /// Builds a runtime on top of `fetcher` and `document`.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(config: KioskoConfig, fetcher: Arc<dyn AssetFetcher>, document: Arc<dyn ModuleDocument>) -> Result<Self> {
        config.validate()?;

        let preload_config = config.preload_config();
        let gauge = ActivityGauge::new();
        let idle: Arc<dyn IdleScheduler> = if config.idle_detection {
            Arc::new(ActivityIdleScheduler::new(gauge.clone()))
        } else {
            Arc::new(FixedDelayIdle::new(preload_config.idle_fallback()))
        };

        let preloader = ModulePreloader::new(preload_config, Arc::clone(&fetcher), Arc::clone(&document), idle)?;
        let manager = ModuleManager::new(config.loader_config(), fetcher, document)?
            .with_activity_gauge(gauge)
            .with_markup_provider(Arc::new(preloader.clone()));

        debug!(idle_detection = config.idle_detection, "Module runtime ready");
        Ok(Self { config, preloader, manager })
    }

    /// Picks the asset source from the configuration: the HTTP origin if
    /// `base_url` is set, otherwise `root` on disk.
    ///
    /// # Errors
    /// Returns `KioskoError::Http` if the HTTP client cannot be built.
    pub fn fetcher_for(config: &KioskoConfig, root: impl Into<PathBuf>) -> Result<Arc<dyn AssetFetcher>> {
        let fetcher: Arc<dyn AssetFetcher> = match &config.base_url {
            Some(base_url) => Arc::new(HttpAssetFetcher::new(base_url.clone())?),
            None => Arc::new(FsAssetFetcher::new(root)),
        };
        Ok(fetcher)
    }

    #[must_use]
    pub fn config(&self) -> &KioskoConfig {
        &self.config
    }

    #[must_use]
    pub fn preloader(&self) -> &ModulePreloader {
        &self.preloader
    }

    #[must_use]
    pub fn manager(&self) -> &ModuleManager {
        &self.manager
    }

    /// Registers a module with the manager.
    pub async fn register(&self, name: &str, config: ModuleConfig) -> bool {
        self.manager.register_module(name, config).await
    }

    /// Navigates to `name`: loads it and marks it active so it stays cached
    /// and its likely successors are warmed.
    ///
    /// # Errors
    /// Returns `KioskoError::Load` if the module fails to load.
    pub async fn open(&self, name: &str) -> Result<LoadOutcome> {
        self.open_with(name, LoadOptions::default()).await
    }

    /// [`open`](Self::open) with explicit load options.
    pub async fn open_with(&self, name: &str, options: LoadOptions) -> Result<LoadOutcome> {
        let outcome = self.manager.load_module(name, options).await?;
        self.preloader.mark_module_active(name).await;
        info!(module = %name, "Module opened");
        Ok(outcome)
    }

    /// Navigates away from `name`: unloads it and lifts its eviction exemption.
    pub async fn close(&self, name: &str) -> bool {
        let had_instance = self.manager.unload_module(name).await;
        self.preloader.mark_module_inactive(name).await;
        had_instance
    }

    pub async fn stats(&self) -> RuntimeStats {
        RuntimeStats { loader: self.manager.get_load_stats().await, cache: self.preloader.get_cache_stats().await }
    }
}
