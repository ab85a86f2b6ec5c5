//! Load errors.

use kiosko_abstraction::FetchError;
use std::time::Duration;
use thiserror::Error;

/// Represents an error that can occur while loading a module.
#[derive(Error, Debug, Clone)]
pub enum LoadError {
    /// The load did not finish within its deadline.
    #[error("Loading module '{module}' timed out after {}ms", .timeout.as_millis())]
    Timeout {
        /// The module being loaded.
        module: String,
        /// The deadline that expired.
        timeout: Duration,
    },

    /// The load was cancelled by the caller.
    #[error("Loading module '{0}' was cancelled")]
    Cancelled(String),

    /// The `before_load` hook failed.
    #[error("beforeLoad hook of module '{module}' failed: {message}")]
    Hook {
        /// The module whose hook failed.
        module: String,
        /// The hook's error message.
        message: String,
    },

    /// A declared dependency failed to load.
    #[error("Dependency '{dependency}' of module '{module}' failed: {source}")]
    Dependency {
        /// The dependent module.
        module: String,
        /// The dependency that failed.
        dependency: String,
        /// Why the dependency failed.
        source: Box<LoadError>,
    },

    /// The dependency graph loops back on itself.
    #[error("Dependency cycle: {}", .0.join(" -> "))]
    DependencyCycle(Vec<String>),

    /// The module's entry point reported an error.
    #[error("Init function of module '{module}' failed: {message}")]
    Init {
        /// The module being initialized.
        module: String,
        /// The entry point's error message.
        message: String,
    },

    /// The markup could not be fetched at all.
    #[error("Fetching markup of module '{module}' failed: {source}")]
    Fetch {
        /// The module being loaded.
        module: String,
        /// The underlying fetch failure.
        source: FetchError,
    },
}

impl LoadError {
    /// Returns `true` if the load was aborted by a timeout or an explicit
    /// cancellation, including when that happened to a dependency.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Cancelled(_) => true,
            Self::Dependency { source, .. } => source.is_cancellation(),
            _ => false,
        }
    }

    /// Returns `true` if this is a timeout rather than an explicit cancel.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Dependency { source, .. } => source.is_timeout(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_classification() {
        let timeout = LoadError::Timeout { module: "caja".to_string(), timeout: Duration::from_secs(10) };
        let cancelled = LoadError::Cancelled("caja".to_string());
        let hook = LoadError::Hook { module: "caja".to_string(), message: "denied".to_string() };

        assert!(timeout.is_cancellation());
        assert!(timeout.is_timeout());
        assert!(cancelled.is_cancellation());
        assert!(!cancelled.is_timeout());
        assert!(!hook.is_cancellation());
    }

    #[test]
    fn test_dependency_error_keeps_cause() {
        let err = LoadError::Dependency {
            module: "ventas".to_string(),
            dependency: "caja".to_string(),
            source: Box::new(LoadError::Cancelled("caja".to_string())),
        };
        assert!(err.is_cancellation());
        assert_eq!(
            err.to_string(),
            "Dependency 'caja' of module 'ventas' failed: Loading module 'caja' was cancelled"
        );
    }

    #[test]
    fn test_display() {
        let err = LoadError::Timeout { module: "x".to_string(), timeout: Duration::from_millis(50) };
        assert_eq!(err.to_string(), "Loading module 'x' timed out after 50ms");

        let cycle = LoadError::DependencyCycle(vec!["a".into(), "b".into(), "a".into()]);
        assert_eq!(cycle.to_string(), "Dependency cycle: a -> b -> a");
    }
}
