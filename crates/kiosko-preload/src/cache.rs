//! Bounded module cache with score-based eviction.

use std::collections::{HashMap, HashSet};
use std::time::Instant;
use tracing::{debug, info};

use crate::types::{CachedModuleAssets, CachedModuleSummary};

/// Cache of warmed module assets keyed by module name.
///
/// After every insertion that pushes the cache over its bound, the entry with
/// the lowest `access_count - age_in_minutes` score is evicted. Modules marked
/// active are never evicted; equal scores evict the oldest entry first.
#[derive(Debug)]
pub struct ModuleCache {
    entries: HashMap<String, CachedModuleAssets>,
    active: HashSet<String>,
    max_size: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl ModuleCache {
    /// Creates an empty cache holding at most `max_size` modules.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: HashMap::new(),
            active: HashSet::new(),
            max_size,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    /// Reads an entry, counting the read towards its score.
    pub fn get(&mut self, module: &str) -> Option<&CachedModuleAssets> {
        match self.entries.get_mut(module) {
            Some(entry) => {
                entry.touch();
                self.hits += 1;
                debug!(module = %module, access_count = entry.access_count, "Cache hit");
                Some(entry)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Reads an entry without counting the read.
    pub fn peek(&self, module: &str) -> Option<&CachedModuleAssets> {
        self.entries.get(module)
    }

    /// Returns `true` if `module` has an entry.
    pub fn contains(&self, module: &str) -> bool {
        self.entries.contains_key(module)
    }

    /// Inserts an entry and enforces the size bound.
    ///
    /// # Returns
    /// The names evicted to make room, if any.
    pub fn insert(&mut self, module: &str, assets: CachedModuleAssets) -> Vec<String> {
        self.insert_at(module, assets, Instant::now())
    }

    fn insert_at(&mut self, module: &str, assets: CachedModuleAssets, now: Instant) -> Vec<String> {
        self.entries.insert(module.to_string(), assets);
        debug!(module = %module, size = self.entries.len(), "Module cached");
        self.enforce_bound(now)
    }

    /// Removes an entry. Returns `true` if it existed.
    pub fn remove(&mut self, module: &str) -> bool {
        self.entries.remove(module).is_some()
    }

    /// Removes every entry. Active marks are kept.
    ///
    /// # Returns
    /// The number of removed entries.
    pub fn clear(&mut self) -> usize {
        let cleared = self.entries.len();
        self.entries.clear();
        info!(cleared, "Cleared module cache");
        cleared
    }

    /// Exempts `module` from eviction.
    pub fn mark_active(&mut self, module: &str) {
        self.active.insert(module.to_string());
    }

    /// Lifts the eviction exemption. Returns `true` if the module was active.
    pub fn mark_inactive(&mut self, module: &str) -> bool {
        self.active.remove(module)
    }

    /// Returns `true` if `module` is marked active.
    pub fn is_active(&self, module: &str) -> bool {
        self.active.contains(module)
    }

    /// Active module names, sorted.
    pub fn active_modules(&self) -> Vec<String> {
        let mut active: Vec<String> = self.active.iter().cloned().collect();
        active.sort();
        active
    }

    /// Number of cached modules.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Configured bound.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// `(hits, misses, evictions)` counters.
    pub fn counters(&self) -> (u64, u64, u64) {
        (self.hits, self.misses, self.evictions)
    }

    /// Per-module summaries, sorted by name.
    pub fn summaries(&self) -> Vec<CachedModuleSummary> {
        let now = Instant::now();
        let mut summaries: Vec<CachedModuleSummary> = self
            .entries
            .iter()
            .map(|(name, entry)| CachedModuleSummary {
                name: name.clone(),
                access_count: entry.access_count,
                age_secs: now.saturating_duration_since(entry.cached_at).as_secs_f64(),
                score: entry.score(now),
                style_ready: entry.style_ready,
                script_available: entry.script_available,
            })
            .collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        summaries
    }

    fn enforce_bound(&mut self, now: Instant) -> Vec<String> {
        let mut evicted = Vec::new();
        while self.entries.len() > self.max_size {
            let Some(victim) = self.eviction_candidate(now) else {
                debug!(size = self.entries.len(), "Cache over bound but every entry is active");
                break;
            };
            if let Some(entry) = self.entries.remove(&victim) {
                self.evictions += 1;
                info!(
                    module = %victim,
                    access_count = entry.access_count,
                    score = entry.score(now),
                    "Evicted module from cache"
                );
            }
            evicted.push(victim);
        }
        evicted
    }

    fn eviction_candidate(&self, now: Instant) -> Option<String> {
        self.entries
            .iter()
            .filter(|(name, _)| !self.active.contains(*name))
            .min_by(|(_, a), (_, b)| {
                a.score(now).total_cmp(&b.score(now)).then_with(|| a.cached_at.cmp(&b.cached_at))
            })
            .map(|(name, _)| name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    /// Reference point one hour after `base`, so ages are expressed without
    /// subtracting from `Instant::now()`.
    struct Clock {
        base: Instant,
    }

    impl Clock {
        fn new() -> Self {
            Self { base: Instant::now() }
        }

        fn now(&self) -> Instant {
            self.base + Duration::from_secs(3600)
        }

        fn assets_aged(&self, minutes: u64, access_count: u64) -> CachedModuleAssets {
            let mut assets = CachedModuleAssets::new("<section></section>".to_string(), true, true);
            assets.cached_at = self.base + Duration::from_secs((60 - minutes) * 60);
            assets.access_count = access_count;
            assets
        }
    }

    #[test]
    fn test_get_counts_reads() {
        let clock = Clock::new();
        let mut cache = ModuleCache::new(6);
        cache.insert("pagos", clock.assets_aged(0, 0));

        assert!(cache.get("pagos").is_some());
        assert_eq!(cache.peek("pagos").unwrap().access_count, 1);
        assert!(cache.get("ventas").is_none());
        assert_eq!(cache.counters(), (1, 1, 0));
    }

    #[test]
    fn test_peek_does_not_count() {
        let clock = Clock::new();
        let mut cache = ModuleCache::new(6);
        cache.insert("pagos", clock.assets_aged(0, 0));
        let _ = cache.peek("pagos");
        assert_eq!(cache.peek("pagos").unwrap().access_count, 0);
    }

    #[test]
    fn test_evicts_lowest_score() {
        let clock = Clock::new();
        let mut cache = ModuleCache::new(2);
        cache.insert_at("caja", clock.assets_aged(0, 5), clock.now());
        cache.insert_at("ventas", clock.assets_aged(10, 2), clock.now());

        let evicted = cache.insert_at("pagos", clock.assets_aged(0, 0), clock.now());

        assert_eq!(evicted, vec!["ventas".to_string()]);
        assert_eq!(cache.len(), 2);
        assert!(cache.contains("caja"));
        assert!(cache.contains("pagos"));
        assert_eq!(cache.counters().2, 1);
    }

    #[test]
    fn test_active_module_is_never_evicted() {
        let clock = Clock::new();
        let mut cache = ModuleCache::new(2);
        cache.insert_at("caja", clock.assets_aged(60, 0), clock.now());
        cache.mark_active("caja");
        cache.insert_at("ventas", clock.assets_aged(0, 3), clock.now());

        let evicted = cache.insert_at("pagos", clock.assets_aged(0, 1), clock.now());

        assert_eq!(evicted, vec!["pagos".to_string()]);
        assert!(cache.contains("caja"));
        assert!(cache.contains("ventas"));
    }

    #[test]
    fn test_all_active_allows_overflow() {
        let clock = Clock::new();
        let mut cache = ModuleCache::new(1);
        cache.mark_active("caja");
        cache.mark_active("ventas");
        cache.insert_at("caja", clock.assets_aged(0, 0), clock.now());

        let evicted = cache.insert_at("ventas", clock.assets_aged(0, 0), clock.now());

        assert!(evicted.is_empty());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_equal_scores_evict_oldest() {
        let clock = Clock::new();
        let mut cache = ModuleCache::new(1);
        // One read and one minute old scores exactly 0.0, as does a fresh entry
        // with no reads.
        cache.insert_at("older", clock.assets_aged(1, 1), clock.now());

        let evicted = cache.insert_at("newer", clock.assets_aged(0, 0), clock.now());

        assert_eq!(evicted, vec!["older".to_string()]);
    }

    #[test]
    fn test_mark_inactive_restores_eviction() {
        let clock = Clock::new();
        let mut cache = ModuleCache::new(1);
        cache.mark_active("caja");
        assert!(cache.is_active("caja"));
        assert!(cache.mark_inactive("caja"));
        assert!(!cache.mark_inactive("caja"));

        cache.insert_at("caja", clock.assets_aged(30, 0), clock.now());
        let evicted = cache.insert_at("ventas", clock.assets_aged(0, 0), clock.now());
        assert_eq!(evicted, vec!["caja".to_string()]);
    }

    #[test]
    fn test_clear_keeps_active_marks() {
        let clock = Clock::new();
        let mut cache = ModuleCache::new(6);
        cache.mark_active("caja");
        cache.insert("caja", clock.assets_aged(0, 0));
        cache.insert("ventas", clock.assets_aged(0, 0));

        assert_eq!(cache.clear(), 2);
        assert!(cache.is_empty());
        assert_eq!(cache.active_modules(), vec!["caja".to_string()]);
    }

    #[test]
    fn test_summaries_sorted_by_name() {
        let clock = Clock::new();
        let mut cache = ModuleCache::new(6);
        cache.insert("ventas", clock.assets_aged(0, 0));
        cache.insert("caja", clock.assets_aged(0, 0));
        let names: Vec<String> = cache.summaries().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["caja", "ventas"]);
    }
}
