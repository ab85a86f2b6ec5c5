//! Speculative module preloading for Kiosko.
//!
//! The preloader warms the assets of modules the user is likely to open next
//! so that navigation can be served from memory:
//!
//! - **Bounded cache**: at most `max_cache_size` modules, evicted by a
//!   recency/frequency score; active modules are never evicted
//! - **Concurrency limit**: at most `max_concurrent` background fetches, the
//!   rest queued in arrival order
//! - **Retry with backoff**: failed warm-ups are retried during idle time with a
//!   linearly growing delay, then abandoned
//! - **Prediction**: a transition table over the access history picks the next
//!   modules to warm
//!
//! All failures are absorbed; a failed warm-up is simply a cache miss.

pub mod cache;
pub mod config;
pub mod history;
pub mod idle;
pub mod predictor;
pub mod preloader;
pub mod types;

pub use cache::ModuleCache;
pub use config::{PreloadConfig, PreloadConfigError};
pub use history::AccessHistory;
pub use idle::{ActivityIdleScheduler, FixedDelayIdle};
pub use predictor::TransitionTable;
pub use preloader::ModulePreloader;
pub use types::{CacheStats, CachedModuleAssets, CachedModuleSummary};
