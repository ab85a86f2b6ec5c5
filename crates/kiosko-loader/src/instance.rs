//! Module instances and lifecycle hooks.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Releases whatever a module instance holds on to.
pub trait Teardown: Send + Sync {
    /// Tears the instance down.
    ///
    /// # Errors
    /// Returns a message describing why teardown failed. The manager logs it
    /// and carries on.
    fn destroy(&self) -> Result<(), String>;
}

/// A live module, as returned by its entry point.
///
/// The shape of an instance is up to the module. The only thing the manager
/// asks of it is whether it can be torn down.
pub trait ModuleInstance: Send + Sync + fmt::Debug {
    /// The instance's teardown capability, if it has one.
    fn teardown(&self) -> Option<&dyn Teardown> {
        None
    }
}

/// Optional callbacks around a module's load and unload.
///
/// Both methods default to doing nothing.
#[async_trait]
pub trait ModuleHooks: Send + Sync {
    /// Runs before anything else is loaded. An error aborts the load.
    async fn before_load(&self, _module: &str) -> Result<(), String> {
        Ok(())
    }

    /// Runs after the instance has been unloaded. Errors are logged only.
    async fn after_unload(&self, _module: &str, _instance: &Arc<dyn ModuleInstance>) -> Result<(), String> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Debug)]
    struct Plain;

    impl ModuleInstance for Plain {}

    #[derive(Debug, Default)]
    struct Closable {
        closed: AtomicBool,
    }

    impl Teardown for Closable {
        fn destroy(&self) -> Result<(), String> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    impl ModuleInstance for Closable {
        fn teardown(&self) -> Option<&dyn Teardown> {
            Some(self)
        }
    }

    struct NoHooks;

    #[async_trait]
    impl ModuleHooks for NoHooks {}

    #[test]
    fn test_teardown_is_optional() {
        assert!(Plain.teardown().is_none());

        let closable = Closable::default();
        closable.teardown().unwrap().destroy().unwrap();
        assert!(closable.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_default_hooks_succeed() {
        let instance: Arc<dyn ModuleInstance> = Arc::new(Plain);
        assert!(NoHooks.before_load("caja").await.is_ok());
        assert!(NoHooks.after_unload("caja", &instance).await.is_ok());
    }
}
