//! The module manager.

use futures::FutureExt;
use futures::future::BoxFuture;
use kiosko_abstraction::{
    ActivityGauge, ActivityGuard, AssetFetcher, CancellationToken, FetchError, MarkupProvider, ModuleDocument,
};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::{LoaderConfig, LoaderConfigError};
use crate::descriptor::{ModuleConfig, ModuleDescriptor};
use crate::error::LoadError;
use crate::events::{EventBus, ModuleEvent, SubscriptionId};
use crate::instance::ModuleInstance;
use crate::lifecycle::{ModuleLifecycle, ModuleState};
use crate::registry::EntryPointRegistry;

/// Per-call load options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Overrides the configured default timeout.
    pub timeout: Option<Duration>,
}

impl LoadOptions {
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout: Some(timeout) }
    }
}

/// Result of a successful load.
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    /// The module's entry point produced an instance, now registered.
    Instance(Arc<dyn ModuleInstance>),
    /// The module has no entry point (or it produced nothing); only its
    /// markup was loaded and nothing was registered.
    Markup { html: String, load_time: Duration },
}

impl LoadOutcome {
    #[must_use]
    pub fn instance(&self) -> Option<&Arc<dyn ModuleInstance>> {
        match self {
            Self::Instance(instance) => Some(instance),
            Self::Markup { .. } => None,
        }
    }

    #[must_use]
    pub fn markup(&self) -> Option<&str> {
        match self {
            Self::Instance(_) => None,
            Self::Markup { html, .. } => Some(html),
        }
    }
}

/// Diagnostic snapshot of the manager.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct LoadStats {
    /// Modules with a registered instance.
    pub loaded: Vec<String>,
    /// Modules with an explicit registration.
    pub registered: Vec<String>,
    /// Modules with a load in flight.
    pub loading: Vec<String>,
    /// Modules whose last load failed.
    pub failed: Vec<String>,
}

/// Bookkeeping for one in-flight load. Dropping it forgets the cancellation
/// token and releases the activity guard, whichever way the load ends. A load
/// dropped before it settled (its caller timed out or was cancelled) leaves
/// the module `Failed` rather than `Loading`.
struct InFlight<'a> {
    table: &'a StdMutex<HashMap<String, CancellationToken>>,
    lifecycle: &'a ModuleLifecycle,
    module: String,
    _activity: ActivityGuard,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.table.lock().unwrap_or_else(PoisonError::into_inner).remove(&self.module);
        self.lifecycle.abandon(&self.module);
    }
}

/// Loads, tracks and unloads modules.
///
/// A module is loaded at most once per session: later calls return the
/// registered instance until the module is unloaded. Concurrent loads of the
/// same module are serialized.
pub struct ModuleManager {
    config: LoaderConfig,
    fetcher: Arc<dyn AssetFetcher>,
    document: Arc<dyn ModuleDocument>,
    markup: Option<Arc<dyn MarkupProvider>>,
    entry_points: EntryPointRegistry,
    descriptors: RwLock<HashMap<String, ModuleDescriptor>>,
    instances: RwLock<HashMap<String, Arc<dyn ModuleInstance>>>,
    lifecycle: ModuleLifecycle,
    events: EventBus,
    load_locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
    in_flight: StdMutex<HashMap<String, CancellationToken>>,
    activity: ActivityGauge,
}

impl fmt::Debug for ModuleManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleManager")
            .field("config", &self.config)
            .field("has_markup_provider", &self.markup.is_some())
            .field("loaded", &self.instances.try_read().map(|i| i.len()).unwrap_or(0))
            .field("active_loads", &self.activity.active())
            .finish_non_exhaustive()
    }
}

impl ModuleManager {
    /// Creates a manager.
    ///
    /// # Arguments
    /// * `config` - Loader configuration
    /// * `fetcher` - Network access for markup
    /// * `document` - Host document stylesheets and scripts are attached to
    ///
    /// # Errors
    /// Returns `LoaderConfigError` if the configuration is invalid.
    pub fn new(
        config: LoaderConfig,
        fetcher: Arc<dyn AssetFetcher>,
        document: Arc<dyn ModuleDocument>,
    ) -> Result<Self, LoaderConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            fetcher,
            document,
            markup: None,
            entry_points: EntryPointRegistry::new(),
            descriptors: RwLock::new(HashMap::new()),
            instances: RwLock::new(HashMap::new()),
            lifecycle: ModuleLifecycle::new(),
            events: EventBus::new(),
            load_locks: StdMutex::new(HashMap::new()),
            in_flight: StdMutex::new(HashMap::new()),
            activity: ActivityGauge::new(),
        })
    }

    /// Consults `provider` for markup before fetching it directly.
    #[must_use]
    pub fn with_markup_provider(mut self, provider: Arc<dyn MarkupProvider>) -> Self {
        self.markup = Some(provider);
        self
    }

    /// Reports in-flight loads on `gauge` instead of a private one.
    #[must_use]
    pub fn with_activity_gauge(mut self, gauge: ActivityGauge) -> Self {
        self.activity = gauge;
        self
    }

    #[must_use]
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Gauge of in-flight loads.
    #[must_use]
    pub fn activity(&self) -> &ActivityGauge {
        &self.activity
    }

    #[must_use]
    pub fn entry_points(&self) -> &EntryPointRegistry {
        &self.entry_points
    }

    /// Registers (or re-registers) a module.
    ///
    /// Replacing a registration never touches an instance that is already
    /// loaded. An entry point supplied in `config` is registered under the
    /// module's entry point name.
    ///
    /// # Returns
    /// Returns `true` if the module was not registered before.
    pub async fn register_module(&self, name: &str, config: ModuleConfig) -> bool {
        let (descriptor, entry_point) = config.into_descriptor(name, &self.config.layout);
        if let Some(entry_point) = entry_point {
            self.entry_points.register_shared(&descriptor.init_function_name, entry_point).await;
        }

        let mut descriptors = self.descriptors.write().await;
        let was_new = descriptors.insert(name.to_string(), descriptor).is_none();
        if was_new {
            debug!(module = %name, "Registered module");
        } else {
            info!(module = %name, "Module registration replaced");
        }
        was_new
    }

    /// The descriptor `load_module` would use for `name`.
    pub async fn descriptor(&self, name: &str) -> ModuleDescriptor {
        self.descriptors
            .read()
            .await
            .get(name)
            .cloned()
            .unwrap_or_else(|| ModuleDescriptor::conventional(name, &self.config.layout))
    }

    /// Loads `name` and its dependencies.
    ///
    /// # Errors
    /// Returns `LoadError::Timeout` if the load outlives its deadline,
    /// `LoadError::Cancelled` if [`cancel_module_load`](Self::cancel_module_load)
    /// was called, and the hook, dependency or entry point failure otherwise.
    /// Nothing is registered on error.
    pub async fn load_module(&self, name: &str, options: LoadOptions) -> Result<LoadOutcome, LoadError> {
        self.load_in_chain(name.to_string(), options.timeout, Vec::new()).await
    }

    /// `chain` holds the modules whose loads are waiting on this one.
    fn load_in_chain(
        &self,
        module: String,
        timeout: Option<Duration>,
        chain: Vec<String>,
    ) -> BoxFuture<'_, Result<LoadOutcome, LoadError>> {
        async move {
            if let Some(instance) = self.get_module_instance(&module).await {
                return Ok(LoadOutcome::Instance(instance));
            }

            if chain.contains(&module) {
                let mut cycle = chain;
                cycle.push(module);
                warn!(chain = ?cycle, "Dependency cycle detected");
                return Err(LoadError::DependencyCycle(cycle));
            }

            // The deadline also bounds the wait behind a concurrent load.
            let timeout = timeout.unwrap_or_else(|| self.config.default_timeout());
            let deadline = tokio::time::Instant::now() + timeout;

            let lock = self.load_lock(&module);
            let Ok(_serial) = tokio::time::timeout_at(deadline, lock.lock()).await else {
                warn!(module = %module, timeout_ms = timeout.as_millis() as u64, "Timed out behind a concurrent load");
                return Err(LoadError::Timeout { module, timeout });
            };
            if let Some(instance) = self.get_module_instance(&module).await {
                debug!(module = %module, "Module loaded by a concurrent call");
                return Ok(LoadOutcome::Instance(instance));
            }

            let descriptor = self.descriptor(&module).await;
            let token = CancellationToken::new();
            let _ = self.lifecycle.set_state(&module, ModuleState::Loading);
            let _in_flight = self.track_in_flight(&module, token.clone());

            let started = Instant::now();
            let mut chain = chain;
            chain.push(module.clone());
            debug!(module = %module, timeout_ms = timeout.as_millis() as u64, "Loading module");

            let result = tokio::select! {
                result = self.run_pipeline(&descriptor, &token, &chain, started) => result,
                () = token.cancelled() => Err(LoadError::Cancelled(module.clone())),
                () = tokio::time::sleep_until(deadline) => {
                    token.cancel();
                    Err(LoadError::Timeout { module: module.clone(), timeout })
                }
            };

            match result {
                Ok(LoadOutcome::Instance(instance)) => {
                    let load_time = started.elapsed();
                    self.instances.write().await.insert(module.clone(), Arc::clone(&instance));
                    let _ = self.lifecycle.set_state(&module, ModuleState::Ready);
                    info!(module = %module, elapsed_ms = load_time.as_millis() as u64, "Module loaded");
                    self.events
                        .emit(&ModuleEvent::Loaded { module, instance: Arc::clone(&instance), load_time })
                        .await;
                    Ok(LoadOutcome::Instance(instance))
                }
                Ok(outcome) => {
                    let _ = self.lifecycle.set_state(&module, ModuleState::Registered);
                    info!(
                        module = %module,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Module rendered without an instance"
                    );
                    Ok(outcome)
                }
                Err(e) => {
                    let _ = self.lifecycle.set_state(&module, ModuleState::Failed);
                    warn!(module = %module, error = %e, "Module load failed");
                    Err(e)
                }
            }
        }
        .boxed()
    }

    async fn run_pipeline(
        &self,
        descriptor: &ModuleDescriptor,
        token: &CancellationToken,
        chain: &[String],
        started: Instant,
    ) -> Result<LoadOutcome, LoadError> {
        let module = descriptor.name.as_str();

        if let Some(hooks) = &descriptor.hooks {
            hooks
                .before_load(module)
                .await
                .map_err(|message| LoadError::Hook { module: module.to_string(), message })?;
        }

        for dependency in &descriptor.dependencies {
            self.load_in_chain(dependency.clone(), None, chain.to_vec()).await.map_err(|source| match source {
                LoadError::DependencyCycle(cycle) => LoadError::DependencyCycle(cycle),
                source => LoadError::Dependency {
                    module: module.to_string(),
                    dependency: dependency.clone(),
                    source: Box::new(source),
                },
            })?;
        }

        let (style_applied, markup) = tokio::join!(self.apply_style(descriptor), self.load_markup(descriptor, token));
        let html = markup?;
        debug!(module = %module, style_applied, markup_bytes = html.len(), "Style and markup ready");

        self.load_script(descriptor).await;

        let Some(entry_point) = self.entry_points.get(&descriptor.init_function_name).await else {
            debug!(module = %module, entry_point = %descriptor.init_function_name, "No entry point registered");
            return Ok(LoadOutcome::Markup { html, load_time: started.elapsed() });
        };

        match entry_point() {
            Ok(Some(instance)) => Ok(LoadOutcome::Instance(instance)),
            Ok(None) => Ok(LoadOutcome::Markup { html, load_time: started.elapsed() }),
            Err(message) => Err(LoadError::Init { module: module.to_string(), message }),
        }
    }

    /// Applies the stylesheet unless it is already present. Failure only
    /// means the style is not applied.
    async fn apply_style(&self, descriptor: &ModuleDescriptor) -> bool {
        if self.document.has_stylesheet(&descriptor.name).await {
            return true;
        }
        let applied = self.document.attach_stylesheet(&descriptor.name, &descriptor.style_path).await;
        if !applied {
            debug!(module = %descriptor.name, url = %descriptor.style_path, "Stylesheet not applied");
        }
        applied
    }

    /// Markup from the provider if it has it, otherwise fetched directly.
    async fn load_markup(&self, descriptor: &ModuleDescriptor, token: &CancellationToken) -> Result<String, LoadError> {
        if let Some(provider) = &self.markup {
            if let Some(html) = provider.module_markup(&descriptor.name).await {
                debug!(module = %descriptor.name, "Markup served by provider");
                return Ok(html);
            }
        }

        match self.fetcher.fetch_text(&descriptor.markup_path, token).await {
            Ok(html) => Ok(html),
            Err(FetchError::Cancelled) => Err(LoadError::Cancelled(descriptor.name.clone())),
            Err(e @ (FetchError::Status(_) | FetchError::NotFound(_))) => {
                warn!(module = %descriptor.name, url = %descriptor.markup_path, error = %e, "Markup unavailable");
                Ok(String::new())
            }
            Err(source) => Err(LoadError::Fetch { module: descriptor.name.clone(), source }),
        }
    }

    async fn load_script(&self, descriptor: &ModuleDescriptor) {
        if self.document.has_script(&descriptor.name).await {
            return;
        }
        if let Err(e) = self.document.inject_script(&descriptor.name, &descriptor.script_path).await {
            warn!(module = %descriptor.name, url = %descriptor.script_path, error = %e, "Script failed to load");
        }
    }

    fn load_lock(&self, module: &str) -> Arc<Mutex<()>> {
        let mut locks = self.load_locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(module.to_string()).or_default())
    }

    fn track_in_flight(&self, module: &str, token: CancellationToken) -> InFlight<'_> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner).insert(module.to_string(), token);
        InFlight {
            table: &self.in_flight,
            lifecycle: &self.lifecycle,
            module: module.to_string(),
            _activity: self.activity.enter(),
        }
    }

    /// Unloads `name`: runs the `after_unload` hook and the instance's
    /// teardown (errors from either are logged only), removes the stylesheet
    /// and forgets the instance. The registration is kept.
    ///
    /// # Returns
    /// Returns `true` if an instance was registered.
    pub async fn unload_module(&self, name: &str) -> bool {
        let instance = self.get_module_instance(name).await;
        let hooks = self.descriptors.read().await.get(name).and_then(|d| d.hooks.clone());

        if let (Some(hooks), Some(instance)) = (&hooks, &instance) {
            if let Err(message) = hooks.after_unload(name, instance).await {
                warn!(module = %name, error = %message, "afterUnload hook failed");
            }
        }

        if let Some(Err(message)) = instance.as_ref().and_then(|i| i.teardown()).map(|t| t.destroy()) {
            warn!(module = %name, error = %message, "Module teardown failed");
        }

        if self.document.remove_stylesheet(name).await {
            debug!(module = %name, "Removed stylesheet");
        }

        let removed = self.instances.write().await.remove(name).is_some();
        if removed {
            let _ = self.lifecycle.set_state(name, ModuleState::Registered);
        }

        info!(module = %name, had_instance = removed, "Module unloaded");
        self.events.emit(&ModuleEvent::Unloaded { module: name.to_string() }).await;
        removed
    }

    /// Cancels the in-flight load of `name`.
    ///
    /// # Returns
    /// Returns `true` if a load was in flight.
    pub fn cancel_module_load(&self, name: &str) -> bool {
        let token = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner).get(name).cloned();
        match token {
            Some(token) => {
                token.cancel();
                info!(module = %name, "Load cancelled");
                true
            }
            None => {
                debug!(module = %name, "No load in flight to cancel");
                false
            }
        }
    }

    pub async fn is_module_loaded(&self, name: &str) -> bool {
        self.instances.read().await.contains_key(name)
    }

    pub async fn get_module_instance(&self, name: &str) -> Option<Arc<dyn ModuleInstance>> {
        self.instances.read().await.get(name).cloned()
    }

    pub fn module_state(&self, name: &str) -> ModuleState {
        self.lifecycle.get_state(name)
    }

    /// Diagnostic snapshot; every list is sorted.
    pub async fn get_load_stats(&self) -> LoadStats {
        let mut loaded: Vec<String> = self.instances.read().await.keys().cloned().collect();
        let mut registered: Vec<String> = self.descriptors.read().await.keys().cloned().collect();
        let mut loading: Vec<String> =
            self.in_flight.lock().unwrap_or_else(PoisonError::into_inner).keys().cloned().collect();
        loaded.sort();
        registered.sort();
        loading.sort();
        let failed = self.lifecycle.modules_in(ModuleState::Failed);
        LoadStats { loaded, registered, loading, failed }
    }

    /// Subscribes to load/unload events.
    pub async fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&ModuleEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(listener).await
    }

    pub async fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id).await
    }
}
