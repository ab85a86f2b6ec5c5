//! Module descriptors and registration options.

use kiosko_abstraction::AssetLayout;
use std::fmt;
use std::sync::Arc;

use crate::instance::{ModuleHooks, ModuleInstance};

/// A module's entry point.
///
/// Takes no arguments. `Ok(Some(_))` is registered as the live instance;
/// `Ok(None)` means the module only contributes markup.
pub type EntryPoint = Arc<dyn Fn() -> Result<Option<Arc<dyn ModuleInstance>>, String> + Send + Sync>;

/// Conventional entry point name for `module`: `ventas` becomes
/// `loadVentasModule`.
#[must_use]
pub fn init_function_name(module: &str) -> String {
    let mut chars = module.chars();
    let capitalized: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    format!("load{capitalized}Module")
}

/// Everything the manager needs to know to load a module.
#[derive(Clone)]
pub struct ModuleDescriptor {
    pub name: String,
    /// Modules that must be loaded first, in order.
    pub dependencies: Vec<String>,
    pub style_path: String,
    pub markup_path: String,
    pub script_path: String,
    /// Key of the module's entry point in the entry point registry.
    pub init_function_name: String,
    pub hooks: Option<Arc<dyn ModuleHooks>>,
}

impl fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("style_path", &self.style_path)
            .field("markup_path", &self.markup_path)
            .field("script_path", &self.script_path)
            .field("init_function_name", &self.init_function_name)
            .field("has_hooks", &self.hooks.is_some())
            .finish()
    }
}

impl ModuleDescriptor {
    /// Descriptor for a module nobody registered: no dependencies, no hooks,
    /// conventional paths and entry point name.
    #[must_use]
    pub fn conventional(name: &str, layout: &AssetLayout) -> Self {
        Self {
            name: name.to_string(),
            dependencies: Vec::new(),
            style_path: layout.style_path(name),
            markup_path: layout.markup_path(name),
            script_path: layout.script_path(name),
            init_function_name: init_function_name(name),
            hooks: None,
        }
    }
}

/// Registration options. Anything left unset falls back to the convention.
#[derive(Clone, Default)]
pub struct ModuleConfig {
    dependencies: Vec<String>,
    style_path: Option<String>,
    markup_path: Option<String>,
    script_path: Option<String>,
    init_function_name: Option<String>,
    hooks: Option<Arc<dyn ModuleHooks>>,
    entry_point: Option<EntryPoint>,
}

impl fmt::Debug for ModuleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleConfig")
            .field("dependencies", &self.dependencies)
            .field("init_function_name", &self.init_function_name)
            .field("has_entry_point", &self.entry_point.is_some())
            .finish_non_exhaustive()
    }
}

impl ModuleConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_style_path(mut self, path: impl Into<String>) -> Self {
        self.style_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_markup_path(mut self, path: impl Into<String>) -> Self {
        self.markup_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_script_path(mut self, path: impl Into<String>) -> Self {
        self.script_path = Some(path.into());
        self
    }

    /// Overrides the entry point name.
    #[must_use]
    pub fn with_init_function(mut self, name: impl Into<String>) -> Self {
        self.init_function_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_hooks(mut self, hooks: Arc<dyn ModuleHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// Supplies the entry point; it is registered under the resolved entry
    /// point name when the module is registered.
    #[must_use]
    pub fn with_entry_point<F>(mut self, entry_point: F) -> Self
    where
        F: Fn() -> Result<Option<Arc<dyn ModuleInstance>>, String> + Send + Sync + 'static,
    {
        self.entry_point = Some(Arc::new(entry_point));
        self
    }

    /// Resolves the options for `name` into a descriptor plus the entry point
    /// to register, if one was supplied.
    #[must_use]
    pub fn into_descriptor(self, name: &str, layout: &AssetLayout) -> (ModuleDescriptor, Option<EntryPoint>) {
        let conventional = ModuleDescriptor::conventional(name, layout);
        let descriptor = ModuleDescriptor {
            name: name.to_string(),
            dependencies: self.dependencies,
            style_path: self.style_path.unwrap_or(conventional.style_path),
            markup_path: self.markup_path.unwrap_or(conventional.markup_path),
            script_path: self.script_path.unwrap_or(conventional.script_path),
            init_function_name: self.init_function_name.unwrap_or(conventional.init_function_name),
            hooks: self.hooks,
        };
        (descriptor, self.entry_point)
    }
}
