//! Shared test doubles for the preloader integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use kiosko_abstraction::{AssetFetcher, CancellationToken, FetchError, ModuleDocument};
use kiosko_preload::{FixedDelayIdle, ModulePreloader, PreloadConfig};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory fetcher that records every markup request.
#[derive(Default)]
pub struct MockFetcher {
    delay: Duration,
    delays: Mutex<HashMap<String, Duration>>,
    responses: Mutex<HashMap<String, Result<String, FetchError>>>,
    requests: Mutex<Vec<String>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every markup fetch takes `delay` to resolve.
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay, ..Self::default() }
    }

    pub fn respond(&self, url: &str, response: Result<String, FetchError>) {
        self.responses.lock().unwrap().insert(url.to_string(), response);
    }

    /// Overrides the fetch delay for one url.
    pub fn delay_for(&self, url: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(url.to_string(), delay);
    }

    pub fn fail(&self, url: &str) {
        self.respond(url, Err(FetchError::Status(500)));
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, url: &str) -> usize {
        self.requests.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    /// Highest number of markup fetches observed in flight at once.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssetFetcher for MockFetcher {
    async fn fetch_text(&self, url: &str, cancel: &CancellationToken) -> Result<String, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let delay = self.delays.lock().unwrap().get(url).copied().unwrap_or(self.delay);
        let cancelled = tokio::select! {
            () = tokio::time::sleep(delay) => false,
            () = cancel.cancelled() => true,
        };
        self.active.fetch_sub(1, Ordering::SeqCst);
        if cancelled {
            return Err(FetchError::Cancelled);
        }

        self.responses
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| Ok(format!("<section>{url}</section>")))
    }

    async fn probe(&self, _url: &str) -> Result<(), FetchError> {
        Ok(())
    }
}

/// Document that accepts every stylesheet.
#[derive(Default)]
pub struct MockDocument {
    warmed: Mutex<Vec<String>>,
    links: Mutex<HashSet<String>>,
    scripts: Mutex<HashSet<String>>,
}

impl MockDocument {
    pub fn warmed(&self) -> Vec<String> {
        self.warmed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModuleDocument for MockDocument {
    async fn preload_style(&self, url: &str) -> bool {
        self.warmed.lock().unwrap().push(url.to_string());
        true
    }

    async fn has_stylesheet(&self, module: &str) -> bool {
        self.links.lock().unwrap().contains(module)
    }

    async fn attach_stylesheet(&self, module: &str, _url: &str) -> bool {
        self.links.lock().unwrap().insert(module.to_string());
        true
    }

    async fn remove_stylesheet(&self, module: &str) -> bool {
        self.links.lock().unwrap().remove(module)
    }

    async fn has_script(&self, module: &str) -> bool {
        self.scripts.lock().unwrap().contains(module)
    }

    async fn inject_script(&self, module: &str, _url: &str) -> Result<(), FetchError> {
        self.scripts.lock().unwrap().insert(module.to_string());
        Ok(())
    }
}

pub fn markup_url(module: &str) -> String {
    format!("./modules/{module}/{module}.html")
}

/// Builds a preloader whose idle scheduler never waits.
pub fn preloader(config: PreloadConfig, fetcher: Arc<MockFetcher>) -> (ModulePreloader, Arc<MockDocument>) {
    preloader_with_idle(config, fetcher, Duration::ZERO)
}

/// Builds a preloader whose idle scheduler always waits `idle`.
pub fn preloader_with_idle(
    config: PreloadConfig,
    fetcher: Arc<MockFetcher>,
    idle: Duration,
) -> (ModulePreloader, Arc<MockDocument>) {
    let document = Arc::new(MockDocument::default());
    let preloader = ModulePreloader::new(
        config,
        fetcher,
        Arc::clone(&document) as Arc<dyn ModuleDocument>,
        Arc::new(FixedDelayIdle::new(idle)),
    )
    .unwrap();
    (preloader, document)
}
