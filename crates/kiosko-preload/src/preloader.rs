//! Background module preloader.

use async_trait::async_trait;
use kiosko_abstraction::{AssetFetcher, CancellationToken, IdleScheduler, MarkupProvider, ModuleDocument};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

use crate::cache::ModuleCache;
use crate::config::{PreloadConfig, PreloadConfigError};
use crate::history::AccessHistory;
use crate::predictor::TransitionTable;
use crate::types::{CacheStats, CachedModuleAssets};

/// Queue and retry bookkeeping.
#[derive(Debug)]
struct PreloadState {
    /// Modules waiting for a free slot, in arrival order.
    queue: VecDeque<String>,
    /// Modules holding a background slot, fetching or about to fetch.
    in_flight: HashSet<String>,
    /// Consecutive failures per module.
    failures: HashMap<String, u32>,
    /// Modules with a retry scheduled but not yet started.
    scheduled_retries: HashSet<String>,
    /// Recently activated modules.
    history: AccessHistory,
}

struct Inner {
    config: PreloadConfig,
    transitions: TransitionTable,
    fetcher: Arc<dyn AssetFetcher>,
    document: Arc<dyn ModuleDocument>,
    idle: Arc<dyn IdleScheduler>,
    /// One permit per background fetch slot.
    slots: Arc<Semaphore>,
    cache: Mutex<ModuleCache>,
    state: Mutex<PreloadState>,
}

/// Warms module assets ahead of navigation.
///
/// Cloning is cheap; clones share the same cache, queue and history. Nothing
/// here ever returns an error to the caller: a failed warm-up is a cache miss.
#[derive(Clone)]
pub struct ModulePreloader {
    inner: Arc<Inner>,
}

impl fmt::Debug for ModulePreloader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModulePreloader")
            .field("config", &self.inner.config)
            .field("cached", &self.inner.cache.try_lock().map(|c| c.len()).unwrap_or(0))
            .field("available_slots", &self.inner.slots.available_permits())
            .finish_non_exhaustive()
    }
}

impl ModulePreloader {
    /// Creates a preloader.
    ///
    /// # Arguments
    /// * `config` - Preload configuration
    /// * `fetcher` - Network access for markup and script probes
    /// * `document` - Host document used to warm stylesheets
    /// * `idle` - Scheduler for queued work and retries
    ///
    /// # Errors
    /// Returns `PreloadConfigError` if the configuration is invalid.
    pub fn new(
        config: PreloadConfig,
        fetcher: Arc<dyn AssetFetcher>,
        document: Arc<dyn ModuleDocument>,
        idle: Arc<dyn IdleScheduler>,
    ) -> Result<Self, PreloadConfigError> {
        config.validate()?;

        let state = PreloadState {
            queue: VecDeque::new(),
            in_flight: HashSet::new(),
            failures: HashMap::new(),
            scheduled_retries: HashSet::new(),
            history: AccessHistory::new(config.history_limit),
        };

        Ok(Self {
            inner: Arc::new(Inner {
                transitions: config.transition_table(),
                slots: Arc::new(Semaphore::new(config.max_concurrent)),
                cache: Mutex::new(ModuleCache::new(config.max_cache_size)),
                state: Mutex::new(state),
                config,
                fetcher,
                document,
                idle,
            }),
        })
    }

    /// The preload configuration.
    #[must_use]
    pub fn config(&self) -> &PreloadConfig {
        &self.inner.config
    }

    /// Warms the assets of `module`.
    ///
    /// A cached module is returned immediately and the read counts towards its
    /// score. When every slot is busy the module is queued (once) and serviced
    /// when a slot frees up; `None` is returned in that case, as it is when the
    /// module is already being fetched or the warm-up fails.
    ///
    /// Only background warm-ups take a slot. The foreground fetch done by
    /// [`get_module_html`](Self::get_module_html) on a miss is not counted.
    pub async fn preload_module(&self, module: &str) -> Option<CachedModuleAssets> {
        if let Some(hit) = self.read_cached(module).await {
            return Some(hit);
        }

        let permit = {
            let mut state = self.inner.state.lock().await;
            if state.in_flight.contains(module) {
                debug!(module = %module, "Preload already in flight");
                return None;
            }

            let Ok(permit) = Arc::clone(&self.inner.slots).try_acquire_owned() else {
                if !state.queue.iter().any(|queued| queued == module) {
                    state.queue.push_back(module.to_string());
                }
                debug!(module = %module, queued = state.queue.len(), "Concurrency limit reached, queued preload");
                return None;
            };

            state.queue.retain(|queued| queued != module);
            state.in_flight.insert(module.to_string());
            permit
        };

        self.run_preload(module, permit).await
    }

    /// Fetches `module` while holding `permit`, then books the outcome,
    /// releases the slot and services the queue.
    async fn run_preload(&self, module: &str, permit: OwnedSemaphorePermit) -> Option<CachedModuleAssets> {
        let assets = self.fetch_assets(module).await;

        let retry_attempt = {
            let mut state = self.inner.state.lock().await;
            state.in_flight.remove(module);
            drop(permit);

            if assets.is_some() {
                state.failures.remove(module);
                None
            } else {
                let failures = state.failures.entry(module.to_string()).or_insert(0);
                *failures += 1;
                let attempt = *failures;
                if attempt > self.inner.config.max_retries {
                    state.failures.remove(module);
                    info!(module = %module, attempts = attempt, "Abandoning preload after repeated failures");
                    None
                } else {
                    state.scheduled_retries.insert(module.to_string());
                    Some(attempt)
                }
            }
        };

        if let Some(attempt) = retry_attempt {
            self.spawn_retry(module.to_string(), attempt);
        }

        self.service_queue().await;
        assets
    }

    /// Returns the markup for `module`.
    ///
    /// Served from the cache when possible (counting as a read); otherwise
    /// fetched right away, without waiting for a background slot.
    pub async fn get_module_html(&self, module: &str) -> Option<String> {
        if let Some(hit) = self.read_cached(module).await {
            return Some(hit.markup);
        }
        self.fetch_assets(module).await.map(|assets| assets.markup)
    }

    /// Marks `module` as in use: it is exempt from eviction and recorded in the
    /// access history. Predicted follow-ups are warmed shortly afterwards.
    pub async fn mark_module_active(&self, module: &str) {
        self.inner.cache.lock().await.mark_active(module);
        self.inner.state.lock().await.history.record(module);
        debug!(module = %module, "Module marked active");
        self.spawn_auto_preload();
    }

    /// Lifts the eviction exemption of `module`. Returns `true` if it was active.
    pub async fn mark_module_inactive(&self, module: &str) -> bool {
        self.inner.cache.lock().await.mark_inactive(module)
    }

    /// The most likely next module that is not cached yet.
    pub async fn predict_next_module(&self) -> Option<String> {
        self.predict(1).await.into_iter().next()
    }

    /// Up to `max_predictions` likely next modules that are not cached yet.
    pub async fn predict_multiple(&self) -> Vec<String> {
        self.predict(self.inner.config.max_predictions).await
    }

    /// Schedules warm-ups for the predicted modules, spaced `stagger_ms` apart.
    ///
    /// # Returns
    /// The modules that were scheduled.
    pub async fn auto_preload(&self) -> Vec<String> {
        let predictions = self.predict_multiple().await;
        for (index, module) in predictions.iter().enumerate() {
            self.spawn_warm_up(module.clone(), self.inner.config.stagger(index));
        }
        if !predictions.is_empty() {
            debug!(predictions = ?predictions, "Scheduled predicted preloads");
        }
        predictions
    }

    /// Removes every cached module and forgets failure counts.
    pub async fn clear_cache(&self) {
        self.inner.cache.lock().await.clear();
        self.inner.state.lock().await.failures.clear();
    }

    /// Returns `true` if `module` is cached. Does not count as a read.
    pub async fn is_cached(&self, module: &str) -> bool {
        self.inner.cache.lock().await.contains(module)
    }

    /// Cached assets of `module` without counting the read.
    pub async fn peek(&self, module: &str) -> Option<CachedModuleAssets> {
        self.inner.cache.lock().await.peek(module).cloned()
    }

    /// Diagnostic snapshot.
    pub async fn get_cache_stats(&self) -> CacheStats {
        let cache = self.inner.cache.lock().await;
        let state = self.inner.state.lock().await;
        let (hits, misses, evictions) = cache.counters();

        let mut in_flight: Vec<String> = state.in_flight.iter().cloned().collect();
        in_flight.sort();

        CacheStats {
            size: cache.len(),
            max_size: cache.max_size(),
            modules: cache.summaries(),
            active: cache.active_modules(),
            history: state.history.to_vec(),
            queued: state.queue.iter().cloned().collect(),
            in_flight,
            pending_retries: state.scheduled_retries.len(),
            hits,
            misses,
            evictions,
        }
    }

    async fn read_cached(&self, module: &str) -> Option<CachedModuleAssets> {
        self.inner.cache.lock().await.get(module).cloned()
    }

    async fn predict(&self, limit: usize) -> Vec<String> {
        let last = self.inner.state.lock().await.history.last().map(str::to_string);
        let cache = self.inner.cache.lock().await;
        self.inner.transitions.predict(last.as_deref(), limit, |module| cache.contains(module))
    }

    /// Fetches markup, warms the stylesheet and probes the script concurrently.
    /// Caches the result only if markup was obtained.
    async fn fetch_assets(&self, module: &str) -> Option<CachedModuleAssets> {
        let layout = &self.inner.config.layout;
        let markup_url = layout.markup_path(module);
        let style_url = layout.style_path(module);
        let script_url = layout.script_path(module);
        let cancel = CancellationToken::new();
        let started = Instant::now();

        let (markup, style_ready, script) = tokio::join!(
            self.inner.fetcher.fetch_text(&markup_url, &cancel),
            self.inner.document.preload_style(&style_url),
            self.inner.fetcher.probe(&script_url),
        );

        let markup = match markup {
            Ok(markup) if !markup.is_empty() => markup,
            Ok(_) => {
                warn!(module = %module, url = %markup_url, "Empty markup, module not cacheable");
                self.purge(module).await;
                return None;
            }
            Err(e) => {
                warn!(module = %module, url = %markup_url, error = %e, "Markup fetch failed");
                self.purge(module).await;
                return None;
            }
        };

        if let Err(e) = &script {
            debug!(module = %module, url = %script_url, error = %e, "Script not reachable");
        }

        let assets = CachedModuleAssets::new(markup, style_ready, script.is_ok());
        let evicted = self.inner.cache.lock().await.insert(module, assets.clone());
        info!(
            module = %module,
            elapsed_ms = started.elapsed().as_millis() as u64,
            style_ready,
            script_available = assets.script_available,
            evicted = ?evicted,
            "Module preloaded"
        );
        Some(assets)
    }

    async fn purge(&self, module: &str) {
        if self.inner.cache.lock().await.remove(module) {
            debug!(module = %module, "Purged stale cache entry");
        }
    }

    /// Hands the oldest queued module that still needs fetching to a
    /// background task, reserving a slot for it.
    ///
    /// Queued modules that got cached or started in the meantime are dropped
    /// from the queue. The head stays queued if another caller took the slot.
    async fn service_queue(&self) {
        loop {
            let module = {
                let mut state = self.inner.state.lock().await;
                if self.inner.slots.available_permits() == 0 {
                    return;
                }
                let Some(module) = state.queue.pop_front() else {
                    return;
                };
                if state.in_flight.contains(&module) {
                    debug!(module = %module, "Queued module already in flight");
                    continue;
                }
                module
            };

            if self.is_cached(&module).await {
                debug!(module = %module, "Queued module already cached");
                continue;
            }

            let permit = {
                let mut state = self.inner.state.lock().await;
                if state.in_flight.contains(&module) {
                    continue;
                }
                let Ok(permit) = Arc::clone(&self.inner.slots).try_acquire_owned() else {
                    state.queue.push_front(module);
                    return;
                };
                state.in_flight.insert(module.clone());
                permit
            };

            debug!(module = %module, "Servicing queued preload");
            self.spawn_reserved_preload(module, permit);
            return;
        }
    }

    /// Waits for the host to go idle, then fetches `module` on the slot
    /// reserved by [`service_queue`](Self::service_queue).
    fn spawn_reserved_preload(&self, module: String, permit: OwnedSemaphorePermit) {
        let this = self.clone();
        tokio::spawn(async move {
            this.inner.idle.idle(this.inner.config.idle_deadline()).await;

            if this.is_cached(&module).await {
                {
                    let mut state = this.inner.state.lock().await;
                    state.in_flight.remove(&module);
                    drop(permit);
                }
                this.service_queue().await;
                return;
            }
            let _ = this.run_preload(&module, permit).await;
        });
    }

    fn spawn_retry(&self, module: String, attempt: u32) {
        let delay = self.inner.config.retry_delay(attempt);
        debug!(module = %module, attempt, delay_ms = delay.as_millis() as u64, "Scheduling preload retry");
        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.inner.idle.idle(this.inner.config.idle_deadline()).await;

            this.inner.state.lock().await.scheduled_retries.remove(&module);
            if this.is_cached(&module).await {
                return;
            }
            let _ = this.preload_module(&module).await;
        });
    }

    fn spawn_warm_up(&self, module: String, delay: Duration) {
        let this = self.clone();
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if this.is_cached(&module).await {
                return;
            }
            let _ = this.preload_module(&module).await;
        });
    }

    fn spawn_auto_preload(&self) {
        let this = self.clone();
        let delay = self.inner.config.auto_preload_delay();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = this.auto_preload().await;
        });
    }
}

#[async_trait]
impl MarkupProvider for ModulePreloader {
    async fn module_markup(&self, module: &str) -> Option<String> {
        self.get_module_html(module).await
    }
}
