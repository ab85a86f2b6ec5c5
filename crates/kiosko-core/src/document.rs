//! In-memory host document.

use async_trait::async_trait;
use kiosko_abstraction::{AssetFetcher, CancellationToken, FetchError, ModuleDocument};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// A stylesheet attached to the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stylesheet {
    pub url: String,
    pub css: String,
}

#[derive(Debug, Default)]
struct DocumentState {
    stylesheets: BTreeMap<String, Stylesheet>,
    scripts: BTreeMap<String, String>,
}

/// Keeps track of the stylesheets and scripts attached per module, loading
/// them through an [`AssetFetcher`].
pub struct InMemoryDocument {
    fetcher: Arc<dyn AssetFetcher>,
    state: RwLock<DocumentState>,
}

impl fmt::Debug for InMemoryDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryDocument").field("state", &self.state.try_read().ok()).finish_non_exhaustive()
    }
}

impl InMemoryDocument {
    #[must_use]
    pub fn new(fetcher: Arc<dyn AssetFetcher>) -> Self {
        Self { fetcher, state: RwLock::new(DocumentState::default()) }
    }

    pub async fn stylesheet(&self, module: &str) -> Option<Stylesheet> {
        self.state.read().await.stylesheets.get(module).cloned()
    }

    /// Modules with an attached stylesheet, sorted.
    pub async fn stylesheet_modules(&self) -> Vec<String> {
        self.state.read().await.stylesheets.keys().cloned().collect()
    }

    /// Modules with an injected script, sorted.
    pub async fn script_modules(&self) -> Vec<String> {
        self.state.read().await.scripts.keys().cloned().collect()
    }
}

#[async_trait]
impl ModuleDocument for InMemoryDocument {
    /// Warms the stylesheet by probing it; nothing is attached.
    async fn preload_style(&self, url: &str) -> bool {
        self.fetcher
            .probe(url)
            .await
            .inspect_err(|e| debug!(url = %url, error = %e, "Stylesheet warm-up failed"))
            .is_ok()
    }

    async fn has_stylesheet(&self, module: &str) -> bool {
        self.state.read().await.stylesheets.contains_key(module)
    }

    async fn attach_stylesheet(&self, module: &str, url: &str) -> bool {
        match self.fetcher.fetch_text(url, &CancellationToken::new()).await {
            Ok(css) => {
                let sheet = Stylesheet { url: url.to_string(), css };
                self.state.write().await.stylesheets.insert(module.to_string(), sheet);
                true
            }
            Err(e) => {
                debug!(module = %module, url = %url, error = %e, "Stylesheet not applied");
                false
            }
        }
    }

    async fn remove_stylesheet(&self, module: &str) -> bool {
        self.state.write().await.stylesheets.remove(module).is_some()
    }

    async fn has_script(&self, module: &str) -> bool {
        self.state.read().await.scripts.contains_key(module)
    }

    async fn inject_script(&self, module: &str, url: &str) -> Result<(), FetchError> {
        // The tag stays in the document whether or not the script loads.
        self.state.write().await.scripts.insert(module.to_string(), url.to_string());
        self.fetcher.fetch_text(url, &CancellationToken::new()).await.map(|_| ()).inspect_err(|e| {
            warn!(module = %module, url = %url, error = %e, "Script failed to load");
        })
    }
}
