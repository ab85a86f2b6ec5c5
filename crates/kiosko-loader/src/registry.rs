//! Entry point registry.
//!
//! Maps entry point names (`loadVentasModule`) to the functions that create
//! module instances.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::descriptor::EntryPoint;
use crate::instance::ModuleInstance;

/// Registry of module entry points.
pub struct EntryPointRegistry {
    entries: Arc<RwLock<HashMap<String, EntryPoint>>>,
}

impl fmt::Debug for EntryPointRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryPointRegistry")
            .field("entry_count", &self.entries.try_read().map(|e| e.len()).unwrap_or(0))
            .finish_non_exhaustive()
    }
}

impl EntryPointRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { entries: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// Registers `entry_point` under `name`.
    ///
    /// # Returns
    /// Returns `true` if the name was new, `false` if an existing entry point
    /// was replaced.
    pub async fn register<F>(&self, name: &str, entry_point: F) -> bool
    where
        F: Fn() -> Result<Option<Arc<dyn ModuleInstance>>, String> + Send + Sync + 'static,
    {
        self.register_shared(name, Arc::new(entry_point)).await
    }

    /// Registers an already shared entry point.
    pub async fn register_shared(&self, name: &str, entry_point: EntryPoint) -> bool {
        let mut entries = self.entries.write().await;
        let was_new = entries.insert(name.to_string(), entry_point).is_none();
        if was_new {
            debug!(entry_point = %name, "Registered entry point");
        } else {
            warn!(entry_point = %name, "Entry point replaced");
        }
        was_new
    }

    /// Looks up the entry point registered under `name`.
    pub async fn get(&self, name: &str) -> Option<EntryPoint> {
        self.entries.read().await.get(name).cloned()
    }
}

impl Default for EntryPointRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Counter;

    impl ModuleInstance for Counter {}

    #[tokio::test]
    async fn test_register_and_get() {
        let registry = EntryPointRegistry::new();
        assert!(registry.register("loadCajaModule", || Ok(Some(Arc::new(Counter) as Arc<dyn ModuleInstance>))).await);

        let entry_point = registry.get("loadCajaModule").await.unwrap();
        assert!(entry_point().unwrap().is_some());
        assert!(registry.get("loadVentasModule").await.is_none());
    }

    #[tokio::test]
    async fn test_register_replaces() {
        let registry = EntryPointRegistry::new();
        assert!(registry.register("loadCajaModule", || Ok(None)).await);
        assert!(!registry.register("loadCajaModule", || Err("broken".to_string())).await);

        let entry_point = registry.get("loadCajaModule").await.unwrap();
        assert_eq!(entry_point().unwrap_err(), "broken");
    }
}
