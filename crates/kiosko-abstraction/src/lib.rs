//! Host abstraction layer for Kiosko.
//!
//! This crate defines the traits the module subsystem consumes from its host
//! environment (network, document, idle scheduling) and the small value types
//! shared between the preloader and the loader.

mod activity;
mod layout;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub use activity::{ActivityGauge, ActivityGuard};
pub use layout::AssetLayout;
pub use tokio_util::sync::CancellationToken;

/// Represents an error that can occur while fetching a module asset.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchError {
    /// The request was aborted through its cancellation token.
    #[error("Request cancelled")]
    Cancelled,

    /// The server answered with a non-success status code.
    #[error("Unexpected status: {0}")]
    Status(u16),

    /// The request could not be completed (connection, DNS, body decoding).
    #[error("Network Error: {0}")]
    Network(String),

    /// The asset does not exist at the given location.
    #[error("Asset not found: {0}")]
    NotFound(String),
}

impl FetchError {
    /// Returns `true` if this error was caused by cancellation rather than an
    /// ordinary failure.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Network access for module assets.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Fetches the body of `url` as text.
    ///
    /// # Errors
    /// Returns `FetchError::Status` for non-success responses and
    /// `FetchError::Cancelled` if `cancel` fires before the body arrives.
    async fn fetch_text(&self, url: &str, cancel: &CancellationToken) -> Result<String, FetchError>;

    /// Checks that `url` is reachable without downloading its body.
    async fn probe(&self, url: &str) -> Result<(), FetchError>;
}

/// The document module resources are attached to.
#[async_trait]
pub trait ModuleDocument: Send + Sync {
    /// Warms a stylesheet without applying it. Returns `true` if the warm-up
    /// succeeded.
    async fn preload_style(&self, url: &str) -> bool;

    /// Returns `true` if a stylesheet link for `module` is already present.
    async fn has_stylesheet(&self, module: &str) -> bool;

    /// Attaches and applies a stylesheet for `module`, resolving once it has
    /// loaded or failed. Returns `false` if it could not be applied.
    async fn attach_stylesheet(&self, module: &str, url: &str) -> bool;

    /// Removes the stylesheet link for `module`. Returns `true` if one existed.
    async fn remove_stylesheet(&self, module: &str) -> bool;

    /// Returns `true` if a script tag for `module` is already present.
    async fn has_script(&self, module: &str) -> bool;

    /// Injects the script for `module` and waits for its load or error event.
    async fn inject_script(&self, module: &str, url: &str) -> Result<(), FetchError>;
}

/// Defers background work until the host has spare capacity.
#[async_trait]
pub trait IdleScheduler: Send + Sync {
    /// Resolves once the host is idle, or after `deadline` at the latest.
    async fn idle(&self, deadline: Duration);
}

/// Read-only access to markup that may already have been fetched in the
/// background.
#[async_trait]
pub trait MarkupProvider: Send + Sync {
    /// Returns the markup for `module`, fetching it if necessary. `None` means
    /// the markup is unavailable and the caller should fetch it itself.
    async fn module_markup(&self, module: &str) -> Option<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_is_cancelled() {
        assert!(FetchError::Cancelled.is_cancelled());
        assert!(!FetchError::Status(404).is_cancelled());
        assert!(!FetchError::Network("reset".to_string()).is_cancelled());
    }

    #[test]
    fn test_fetch_error_display() {
        assert_eq!(FetchError::Status(503).to_string(), "Unexpected status: 503");
        assert_eq!(FetchError::Cancelled.to_string(), "Request cancelled");
    }

    #[test]
    fn test_fetch_error_serialization() {
        let json = serde_json::to_string(&FetchError::Status(404)).unwrap();
        let back: FetchError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, FetchError::Status(404));
    }
}
