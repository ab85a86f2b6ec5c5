//! Configuration for module preloading.

use kiosko_abstraction::AssetLayout;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::predictor::TransitionTable;

/// Configuration for the module preloader.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PreloadConfig {
    /// Maximum number of cached modules (default: 6).
    #[serde(default = "default_max_cache_size")]
    pub max_cache_size: usize,

    /// Maximum number of simultaneous background fetches (default: 2).
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Retries after the initial attempt fails (default: 2).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay unit for retries; retry `n` waits `n` times this (default: 1000).
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Longest an idle-scheduled task may be deferred (default: 3000).
    #[serde(default = "default_idle_deadline_ms")]
    pub idle_deadline_ms: u64,

    /// Fixed delay used when no idle detection is available (default: 100).
    #[serde(default = "default_idle_fallback_ms")]
    pub idle_fallback_ms: u64,

    /// Delay between marking a module active and predicting (default: 1000).
    #[serde(default = "default_auto_preload_delay_ms")]
    pub auto_preload_delay_ms: u64,

    /// Spacing between predicted warm-ups (default: 500).
    #[serde(default = "default_stagger_ms")]
    pub stagger_ms: u64,

    /// Number of distinct modules kept in the access history (default: 10).
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Modules warmed per prediction round (default: 2).
    #[serde(default = "default_max_predictions")]
    pub max_predictions: usize,

    /// Where module assets live.
    #[serde(default)]
    pub layout: AssetLayout,

    /// Override for the built-in transition table.
    #[serde(default)]
    pub transitions: Option<TransitionTable>,
}

fn default_max_cache_size() -> usize {
    6
}

fn default_max_concurrent() -> usize {
    2
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}

fn default_idle_deadline_ms() -> u64 {
    3000
}

fn default_idle_fallback_ms() -> u64 {
    100
}

fn default_auto_preload_delay_ms() -> u64 {
    1000
}

fn default_stagger_ms() -> u64 {
    500
}

fn default_history_limit() -> usize {
    10
}

fn default_max_predictions() -> usize {
    2
}

/// Errors that can occur during preload configuration validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PreloadConfigError {
    /// Invalid max cache size (must be > 0).
    #[error("Invalid max cache size: must be greater than 0")]
    InvalidMaxCacheSize,

    /// Invalid concurrency limit (must be > 0).
    #[error("Invalid concurrency limit: must be greater than 0")]
    InvalidMaxConcurrent,

    /// Invalid history limit (must be > 0).
    #[error("Invalid history limit: must be greater than 0")]
    InvalidHistoryLimit,
}

impl Default for PreloadConfig {
    fn default() -> Self {
        Self {
            max_cache_size: default_max_cache_size(),
            max_concurrent: default_max_concurrent(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            idle_deadline_ms: default_idle_deadline_ms(),
            idle_fallback_ms: default_idle_fallback_ms(),
            auto_preload_delay_ms: default_auto_preload_delay_ms(),
            stagger_ms: default_stagger_ms(),
            history_limit: default_history_limit(),
            max_predictions: default_max_predictions(),
            layout: AssetLayout::default(),
            transitions: None,
        }
    }
}

impl PreloadConfig {
    /// Validate the preload configuration.
    ///
    /// # Errors
    /// Returns `PreloadConfigError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), PreloadConfigError> {
        if self.max_cache_size == 0 {
            return Err(PreloadConfigError::InvalidMaxCacheSize);
        }

        if self.max_concurrent == 0 {
            return Err(PreloadConfigError::InvalidMaxConcurrent);
        }

        if self.history_limit == 0 {
            return Err(PreloadConfigError::InvalidHistoryLimit);
        }

        Ok(())
    }

    /// Delay before retry number `attempt` (1-based).
    #[must_use]
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms.saturating_mul(u64::from(attempt)))
    }

    /// Upper bound on idle deferral.
    #[must_use]
    pub fn idle_deadline(&self) -> Duration {
        Duration::from_millis(self.idle_deadline_ms)
    }

    /// Fallback idle delay.
    #[must_use]
    pub fn idle_fallback(&self) -> Duration {
        Duration::from_millis(self.idle_fallback_ms)
    }

    /// Delay before automatic prediction.
    #[must_use]
    pub fn auto_preload_delay(&self) -> Duration {
        Duration::from_millis(self.auto_preload_delay_ms)
    }

    /// Offset of the `index`-th predicted warm-up.
    #[must_use]
    pub fn stagger(&self, index: usize) -> Duration {
        Duration::from_millis(self.stagger_ms.saturating_mul(index as u64))
    }

    /// The configured transition table, or the built-in one.
    #[must_use]
    pub fn transition_table(&self) -> TransitionTable {
        self.transitions.clone().unwrap_or_default()
    }
}
