//! Kiosko runtime.
//!
//! Wires the preloader and the module manager to concrete hosts: an HTTP
//! origin or a local directory for assets, and an in-memory document that
//! keeps track of attached stylesheets and scripts.

pub mod config;
pub mod document;
pub mod error;
pub mod fs;
pub mod http;
pub mod runtime;

pub use config::{ConfigError, ConfigResult, KioskoConfig};
pub use document::InMemoryDocument;
pub use error::{KioskoError, Result};
pub use fs::FsAssetFetcher;
pub use http::HttpAssetFetcher;
pub use runtime::{ModuleRuntime, RuntimeStats};
