//! Runtime configuration.
//!
//! Configuration is read from TOML. Two files are consulted, the later one
//! overriding individual keys of the earlier:
//!
//! 1. `~/.kiosko/config.toml`
//! 2. `./kiosko.toml`
//!
//! `KIOSKO_BASE_URL` and `KIOSKO_LOG_LEVEL` override both.

use kiosko_abstraction::AssetLayout;
use kiosko_loader::LoaderConfig;
use kiosko_preload::PreloadConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use toml::Table;
use tracing::debug;

/// Environment variable overriding `base_url`.
pub const BASE_URL_ENV: &str = "KIOSKO_BASE_URL";
/// Environment variable overriding `log_level`.
pub const LOG_LEVEL_ENV: &str = "KIOSKO_LOG_LEVEL";

fn default_idle_detection() -> bool {
    true
}

/// Kiosko configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KioskoConfig {
    /// HTTP origin serving module assets. Assets are read from disk when unset.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Module directory; overrides the layout of both `loader` and `preload`.
    #[serde(default)]
    pub modules_dir: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default)]
    pub log_level: Option<String>,

    /// Defer background work until no foreground load is running. When off,
    /// background work waits `preload.idle_fallback_ms` instead.
    #[serde(default = "default_idle_detection")]
    pub idle_detection: bool,

    #[serde(default)]
    pub loader: LoaderConfig,

    #[serde(default)]
    pub preload: PreloadConfig,
}

impl Default for KioskoConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            modules_dir: None,
            log_level: None,
            idle_detection: default_idle_detection(),
            loader: LoaderConfig::default(),
            preload: PreloadConfig::default(),
        }
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found.
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    /// Failed to read or write a configuration file.
    #[error("Failed to access configuration file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a configuration file.
    #[error("Failed to parse configuration file {path}: {message}")]
    Parse { path: String, message: String },

    /// Failed to serialize the configuration.
    #[error("Failed to serialize configuration: {0}")]
    Serialize(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

impl KioskoConfig {
    /// Loads configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let table = read_table(path)?;
        Self::from_table(table, path)
    }

    /// Saves configuration to a TOML file, creating parent directories.
    pub fn save_to_file(&self, path: &Path) -> ConfigResult<()> {
        let content = self.to_toml_string()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|source| ConfigError::Io { path: parent.display().to_string(), source })?;
        }
        std::fs::write(path, content).map_err(|source| ConfigError::Io { path: path.display().to_string(), source })
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Default global configuration file path.
    pub fn default_global_path() -> PathBuf {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(".kiosko")
            .join("config.toml")
    }

    /// Default local configuration file path.
    pub fn default_local_path() -> PathBuf {
        PathBuf::from("kiosko.toml")
    }

    /// Discovers and loads the global and local configuration files, then
    /// applies environment overrides.
    ///
    /// Missing files are skipped; a file that exists but does not parse is an
    /// error.
    pub fn discover_and_load() -> ConfigResult<Self> {
        let mut config = Self::discover_from(&[Self::default_global_path(), Self::default_local_path()])?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Merges the files in `paths` in order; later files override keys of
    /// earlier ones.
    pub fn discover_from(paths: &[PathBuf]) -> ConfigResult<Self> {
        let mut merged = Table::new();
        for path in paths {
            if !path.exists() {
                debug!(path = %path.display(), "Configuration file not present");
                continue;
            }
            debug!(path = %path.display(), "Loading configuration file");
            merge_tables(&mut merged, read_table(path)?);
        }
        Self::from_table(merged, Path::new("<merged>"))
    }

    /// Applies `KIOSKO_BASE_URL` and `KIOSKO_LOG_LEVEL`.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(std::env::var(BASE_URL_ENV).ok(), std::env::var(LOG_LEVEL_ENV).ok());
    }

    /// Overrides `base_url` and `log_level` with any value given.
    pub fn apply_overrides(&mut self, base_url: Option<String>, log_level: Option<String>) {
        if let Some(base_url) = base_url.filter(|v| !v.is_empty()) {
            self.base_url = Some(base_url);
        }
        if let Some(log_level) = log_level.filter(|v| !v.is_empty()) {
            self.log_level = Some(log_level);
        }
    }

    /// Validates every section.
    pub fn validate(&self) -> ConfigResult<()> {
        self.preload.validate().map_err(|e| ConfigError::InvalidValue(format!("preload: {e}")))?;
        self.loader.validate().map_err(|e| ConfigError::InvalidValue(format!("loader: {e}")))?;
        if let Some(base_url) = &self.base_url {
            if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
                return Err(ConfigError::InvalidValue(format!("base_url must be an http(s) URL: {base_url}")));
            }
        }
        Ok(())
    }

    /// Preload settings with `modules_dir` applied.
    #[must_use]
    pub fn preload_config(&self) -> PreloadConfig {
        let mut preload = self.preload.clone();
        if let Some(dir) = &self.modules_dir {
            preload.layout = AssetLayout::new(dir.clone());
        }
        preload
    }

    /// Loader settings with `modules_dir` applied.
    #[must_use]
    pub fn loader_config(&self) -> LoaderConfig {
        let mut loader = self.loader.clone();
        if let Some(dir) = &self.modules_dir {
            loader.layout = AssetLayout::new(dir.clone());
        }
        loader
    }

    fn from_table(table: Table, origin: &Path) -> ConfigResult<Self> {
        toml::Value::Table(table)
            .try_into()
            .map_err(|e| ConfigError::Parse { path: origin.display().to_string(), message: e.to_string() })
    }
}

fn read_table(path: &Path) -> ConfigResult<Table> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.display().to_string()));
    }
    let content =
        std::fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.display().to_string(), source })?;
    content
        .parse::<Table>()
        .map_err(|e| ConfigError::Parse { path: path.display().to_string(), message: e.to_string() })
}

/// Recursively merges `overlay` into `base`; nested tables merge key by key.
fn merge_tables(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => merge_tables(existing, incoming),
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
