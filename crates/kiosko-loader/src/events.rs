//! Module load/unload notifications.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

use crate::instance::ModuleInstance;

/// A notification emitted by the module manager.
#[derive(Debug, Clone)]
pub enum ModuleEvent {
    /// A module finished loading and its instance is registered.
    Loaded {
        module: String,
        instance: Arc<dyn ModuleInstance>,
        load_time: Duration,
    },
    /// A module was unloaded.
    Unloaded { module: String },
}

impl ModuleEvent {
    /// Name of the module the event is about.
    #[must_use]
    pub fn module(&self) -> &str {
        match self {
            Self::Loaded { module, .. } | Self::Unloaded { module } => module,
        }
    }
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&ModuleEvent) + Send + Sync>;

/// Fan-out of module events to subscribers.
///
/// Emitting with no subscribers does nothing.
pub struct EventBus {
    next_id: AtomicU64,
    listeners: RwLock<Vec<(SubscriptionId, Listener)>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.listeners.try_read().map(|l| l.len()).unwrap_or(0))
            .finish_non_exhaustive()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self { next_id: AtomicU64::new(1), listeners: RwLock::new(Vec::new()) }
    }

    /// Registers `listener` for every future event.
    pub async fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&ModuleEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().await.push((id, Arc::new(listener)));
        id
    }

    /// Removes a subscription. Returns `false` if it was already gone.
    pub async fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.write().await;
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub async fn subscriber_count(&self) -> usize {
        self.listeners.read().await.len()
    }

    /// Delivers `event` to every subscriber, outside the subscription lock.
    pub async fn emit(&self, event: &ModuleEvent) {
        let listeners: Vec<Listener> = self.listeners.read().await.iter().map(|(_, l)| Arc::clone(l)).collect();
        if listeners.is_empty() {
            return;
        }
        debug!(module = %event.module(), subscribers = listeners.len(), "Emitting module event");
        for listener in listeners {
            listener(event);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
