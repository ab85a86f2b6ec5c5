//! Conventional asset locations for modules.

use serde::{Deserialize, Serialize};

fn default_base_dir() -> String {
    "./modules".to_string()
}

/// Derives asset paths from a module name.
///
/// A module named `ventas` lives under `{base_dir}/ventas/` with
/// `ventas.css`, `ventas.html` and `ventas.js`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetLayout {
    /// Directory (or URL path prefix) holding one sub-directory per module.
    #[serde(default = "default_base_dir")]
    pub base_dir: String,
}

impl Default for AssetLayout {
    fn default() -> Self {
        Self { base_dir: default_base_dir() }
    }
}

impl AssetLayout {
    /// Creates a layout rooted at `base_dir`.
    #[must_use]
    pub fn new(base_dir: impl Into<String>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    /// Directory holding the assets of `module`.
    #[must_use]
    pub fn module_dir(&self, module: &str) -> String {
        format!("{}/{}", self.base_dir.trim_end_matches('/'), module)
    }

    /// Conventional stylesheet path.
    #[must_use]
    pub fn style_path(&self, module: &str) -> String {
        format!("{}/{}.css", self.module_dir(module), module)
    }

    /// Conventional markup path.
    #[must_use]
    pub fn markup_path(&self, module: &str) -> String {
        format!("{}/{}.html", self.module_dir(module), module)
    }

    /// Conventional script path.
    #[must_use]
    pub fn script_path(&self, module: &str) -> String {
        format!("{}/{}.js", self.module_dir(module), module)
    }
}
