//! Core data types for module preloading.

use serde::Serialize;
use std::time::Instant;

/// Assets warmed for a single module.
#[derive(Debug, Clone)]
pub struct CachedModuleAssets {
    /// The fetched markup body.
    pub markup: String,
    /// Whether the stylesheet was warmed without being applied.
    pub style_ready: bool,
    /// Whether the script was confirmed reachable (existence only).
    pub script_available: bool,
    /// When the entry was inserted.
    pub cached_at: Instant,
    /// Number of reads served from this entry.
    pub access_count: u64,
}

impl CachedModuleAssets {
    /// Creates a new entry stamped with the current time and no recorded reads.
    #[must_use]
    pub fn new(markup: String, style_ready: bool, script_available: bool) -> Self {
        Self { markup, style_ready, script_available, cached_at: Instant::now(), access_count: 0 }
    }

    /// Records a read of this entry.
    pub fn touch(&mut self) {
        self.access_count = self.access_count.saturating_add(1);
    }

    /// Eviction score: reads minus age in minutes. Lower scores are evicted first.
    #[must_use]
    pub fn score(&self, now: Instant) -> f64 {
        let age_minutes = now.saturating_duration_since(self.cached_at).as_secs_f64() / 60.0;
        self.access_count as f64 - age_minutes
    }
}

/// Per-module line of a [`CacheStats`] snapshot.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CachedModuleSummary {
    /// Module name.
    pub name: String,
    /// Reads served from the cache.
    pub access_count: u64,
    /// Seconds since the entry was cached.
    pub age_secs: f64,
    /// Current eviction score.
    pub score: f64,
    /// Whether the stylesheet was warmed.
    pub style_ready: bool,
    /// Whether the script was reachable.
    pub script_available: bool,
}

/// Preloader statistics for diagnostics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of cached modules.
    pub size: usize,
    /// Configured cache bound.
    pub max_size: usize,
    /// Cached modules, sorted by name.
    pub modules: Vec<CachedModuleSummary>,
    /// Modules currently marked active.
    pub active: Vec<String>,
    /// Access history, oldest first.
    pub history: Vec<String>,
    /// Modules waiting for a free slot, in service order.
    pub queued: Vec<String>,
    /// Modules holding a background slot. Foreground reads through
    /// `get_module_html` are not counted here.
    pub in_flight: Vec<String>,
    /// Retries scheduled but not yet started.
    pub pending_retries: usize,
    /// Reads served from the cache.
    pub hits: u64,
    /// Reads that found no entry.
    pub misses: u64,
    /// Entries removed by the size bound.
    pub evictions: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_new_entry_has_no_reads() {
        let assets = CachedModuleAssets::new("<div></div>".to_string(), true, false);
        assert_eq!(assets.access_count, 0);
        assert!(assets.style_ready);
        assert!(!assets.script_available);
    }

    #[test]
    fn test_touch_increments_access_count() {
        let mut assets = CachedModuleAssets::new(String::new(), false, false);
        assets.touch();
        assets.touch();
        assert_eq!(assets.access_count, 2);
    }

    #[test]
    fn test_score_penalises_age() {
        let mut assets = CachedModuleAssets::new(String::new(), false, false);
        assets.access_count = 3;

        let now = assets.cached_at + Duration::from_secs(120);
        let score = assets.score(now);
        assert!((score - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_score_of_fresh_entry_is_access_count() {
        let mut assets = CachedModuleAssets::new(String::new(), false, false);
        assets.access_count = 4;
        assert!((assets.score(assets.cached_at) - 4.0).abs() < f64::EPSILON);
    }
}
