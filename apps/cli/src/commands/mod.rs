//! Command implementations.

pub mod config;
pub mod load;
pub mod predict;
pub mod preload;

pub use config::ConfigCommand;

use anyhow::{Context, Result};
use kiosko_core::{InMemoryDocument, KioskoConfig, ModuleRuntime};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Settings shared by every command.
#[derive(Debug)]
pub struct Session {
    pub config: KioskoConfig,
    /// Asset root used when no HTTP origin is configured.
    pub root: PathBuf,
    pub json: bool,
}

impl Session {
    /// Builds a runtime over the configured asset source and the in-memory
    /// document it attaches stylesheets and scripts to.
    pub fn runtime(&self) -> Result<(ModuleRuntime, Arc<InMemoryDocument>)> {
        self.config.validate()?;
        let fetcher = ModuleRuntime::fetcher_for(&self.config, &self.root)?;
        let document = Arc::new(InMemoryDocument::new(Arc::clone(&fetcher)));
        let runtime = ModuleRuntime::new(self.config.clone(), fetcher, document.clone())?;
        Ok((runtime, document))
    }
}

/// Resolves the effective configuration.
///
/// An explicit `path` replaces discovery. Environment overrides apply in both
/// cases, then the command-line flags.
pub fn load_config(path: Option<&Path>, base_url: Option<String>, modules_dir: Option<String>) -> Result<KioskoConfig> {
    let mut config = match path {
        Some(path) => {
            let mut config = KioskoConfig::load_from_file(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            config.apply_env_overrides();
            config
        }
        None => KioskoConfig::discover_and_load().context("Failed to load configuration")?,
    };

    config.apply_overrides(base_url, None);
    if let Some(dir) = modules_dir {
        config.modules_dir = Some(dir);
    }
    Ok(config)
}
