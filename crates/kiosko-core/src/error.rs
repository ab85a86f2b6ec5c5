//! Error types for the Kiosko runtime.

use kiosko_loader::{LoadError, LoaderConfigError};
use kiosko_preload::PreloadConfigError;
use thiserror::Error;

use crate::config::ConfigError;

/// Top-level error for the Kiosko runtime.
#[derive(Error, Debug)]
pub enum KioskoError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A module failed to load.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Invalid preload settings.
    #[error("Invalid preload configuration: {0}")]
    Preload(#[from] PreloadConfigError),

    /// Invalid loader settings.
    #[error("Invalid loader configuration: {0}")]
    Loader(#[from] LoaderConfigError),

    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Http(String),
}

/// Result type for Kiosko runtime operations.
pub type Result<T> = std::result::Result<T, KioskoError>;
