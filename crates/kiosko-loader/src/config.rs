//! Loader configuration.

use kiosko_abstraction::AssetLayout;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Configuration for the module manager.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Deadline for a load when the caller does not pass one (default: 10000).
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,

    /// Where module assets live when a module has no explicit paths.
    #[serde(default)]
    pub layout: AssetLayout,
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self { default_timeout_ms: default_timeout_ms(), layout: AssetLayout::default() }
    }
}

/// Errors that can occur when validating loader configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoaderConfigError {
    /// The default timeout must be greater than 0.
    #[error("default_timeout_ms must be greater than 0")]
    InvalidTimeout,
}

impl LoaderConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns `LoaderConfigError` if any value is out of range.
    pub fn validate(&self) -> Result<(), LoaderConfigError> {
        if self.default_timeout_ms == 0 {
            return Err(LoaderConfigError::InvalidTimeout);
        }
        Ok(())
    }

    #[must_use]
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }
}
