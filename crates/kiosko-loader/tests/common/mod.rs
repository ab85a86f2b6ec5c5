//! Shared test doubles for the module manager integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use kiosko_abstraction::{AssetFetcher, CancellationToken, FetchError, ModuleDocument};
use kiosko_loader::{LoaderConfig, ModuleHooks, ModuleInstance, ModuleManager, Teardown};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Ordered record of what happened across fetcher, document and events.
pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

pub struct MockFetcher {
    journal: Journal,
    delay: Duration,
    responses: Mutex<HashMap<String, Result<String, FetchError>>>,
}

impl MockFetcher {
    pub fn new(journal: Journal) -> Self {
        Self { journal, delay: Duration::ZERO, responses: Mutex::new(HashMap::new()) }
    }

    pub fn with_delay(journal: Journal, delay: Duration) -> Self {
        Self { delay, ..Self::new(journal) }
    }

    pub fn respond(&self, url: &str, response: Result<String, FetchError>) {
        self.responses.lock().unwrap().insert(url.to_string(), response);
    }

    pub fn fetches(&self, url: &str) -> usize {
        let needle = format!("fetch:{url}");
        self.journal.lock().unwrap().iter().filter(|e| **e == needle).count()
    }
}

#[async_trait]
impl AssetFetcher for MockFetcher {
    async fn fetch_text(&self, url: &str, cancel: &CancellationToken) -> Result<String, FetchError> {
        self.journal.lock().unwrap().push(format!("fetch:{url}"));
        tokio::select! {
            () = tokio::time::sleep(self.delay) => {}
            () = cancel.cancelled() => return Err(FetchError::Cancelled),
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

pub struct MockDocument {
    journal: Journal,
    links: Mutex<HashSet<String>>,
    scripts: Mutex<HashSet<String>>,
    broken_scripts: Mutex<HashSet<String>>,
}

impl MockDocument {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            links: Mutex::new(HashSet::new()),
            scripts: Mutex::new(HashSet::new()),
            broken_scripts: Mutex::new(HashSet::new()),
        }
    }

    pub fn break_script(&self, module: &str) {
        self.broken_scripts.lock().unwrap().insert(module.to_string());
    }

    pub fn has_link(&self, module: &str) -> bool {
        self.links.lock().unwrap().contains(module)
    }
}

#[async_trait]
impl ModuleDocument for MockDocument {
    async fn preload_style(&self, url: &str) -> bool {
        self.journal.lock().unwrap().push(format!("preload:{url}"));
        true
    }

    async fn has_stylesheet(&self, module: &str) -> bool {
        self.links.lock().unwrap().contains(module)
    }

    async fn attach_stylesheet(&self, module: &str, url: &str) -> bool {
        self.journal.lock().unwrap().push(format!("style:{url}"));
        self.links.lock().unwrap().insert(module.to_string());
        true
    }

    async fn remove_stylesheet(&self, module: &str) -> bool {
        self.links.lock().unwrap().remove(module)
    }

    async fn has_script(&self, module: &str) -> bool {
        self.scripts.lock().unwrap().contains(module)
    }

    async fn inject_script(&self, module: &str, url: &str) -> Result<(), FetchError> {
        self.journal.lock().unwrap().push(format!("script:{url}"));
        if self.broken_scripts.lock().unwrap().contains(module) {
            return Err(FetchError::NotFound(url.to_string()));
        }
        self.scripts.lock().unwrap().insert(module.to_string());
        Ok(())
    }
}

/// Instance with a teardown that can be told to fail.
#[derive(Debug, Default)]
pub struct TestInstance {
    pub name: String,
    pub fail_teardown: bool,
    pub destroyed: AtomicUsize,
}

impl Teardown for TestInstance {
    fn destroy(&self) -> Result<(), String> {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
        if self.fail_teardown { Err("teardown exploded".to_string()) } else { Ok(()) }
    }
}

impl ModuleInstance for TestInstance {
    fn teardown(&self) -> Option<&dyn Teardown> {
        Some(self)
    }
}

/// Hooks that journal their calls and fail on demand.
pub struct RecordingHooks {
    pub journal: Journal,
    pub fail_before: bool,
    pub fail_after: bool,
}

#[async_trait]
impl ModuleHooks for RecordingHooks {
    async fn before_load(&self, module: &str) -> Result<(), String> {
        self.journal.lock().unwrap().push(format!("before:{module}"));
        if self.fail_before { Err("not allowed".to_string()) } else { Ok(()) }
    }

    async fn after_unload(&self, module: &str, _instance: &Arc<dyn ModuleInstance>) -> Result<(), String> {
        self.journal.lock().unwrap().push(format!("after:{module}"));
        if self.fail_after { Err("cleanup failed".to_string()) } else { Ok(()) }
    }
}

/// Entry point that counts its invocations.
pub fn counting_entry_point(
    name: &str,
    calls: Arc<AtomicUsize>,
) -> impl Fn() -> Result<Option<Arc<dyn ModuleInstance>>, String> + Send + Sync + 'static {
    let name = name.to_string();
    move || {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(Arc::new(TestInstance { name: name.clone(), ..TestInstance::default() }) as Arc<dyn ModuleInstance>))
    }
}

pub struct Harness {
    pub journal: Journal,
    pub fetcher: Arc<MockFetcher>,
    pub document: Arc<MockDocument>,
    pub manager: ModuleManager,
}

pub fn harness_with_delay(delay: Duration) -> Harness {
    let journal = journal();
    let fetcher = Arc::new(MockFetcher::with_delay(Arc::clone(&journal), delay));
    let document = Arc::new(MockDocument::new(Arc::clone(&journal)));
    let manager = ModuleManager::new(
        LoaderConfig::default(),
        Arc::clone(&fetcher) as Arc<dyn AssetFetcher>,
        Arc::clone(&document) as Arc<dyn ModuleDocument>,
    )
    .unwrap();
    Harness { journal, fetcher, document, manager }
}

pub fn harness() -> Harness {
    harness_with_delay(Duration::ZERO)
}
