//! Foreground activity tracking.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct GaugeInner {
    active: AtomicUsize,
    changed: Notify,
}

/// Counts foreground operations currently in flight.
///
/// Clones share the same counter. Background work consults the gauge to decide
/// whether the host is idle.
#[derive(Debug, Clone, Default)]
pub struct ActivityGauge {
    inner: Arc<GaugeInner>,
}

impl ActivityGauge {
    /// Creates a gauge with no recorded activity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the start of a foreground operation. The operation ends when the
    /// returned guard is dropped.
    #[must_use = "activity ends as soon as the guard is dropped"]
    pub fn enter(&self) -> ActivityGuard {
        self.inner.active.fetch_add(1, Ordering::SeqCst);
        ActivityGuard { gauge: self.clone() }
    }

    /// Number of foreground operations in flight.
    pub fn active(&self) -> usize {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Returns `true` when no foreground operation is in flight.
    pub fn is_idle(&self) -> bool {
        self.active() == 0
    }

    /// Waits until no foreground operation is in flight.
    pub async fn wait_idle(&self) {
        loop {
            let changed = self.inner.changed.notified();
            if self.is_idle() {
                return;
            }
            changed.await;
        }
    }
}

/// Marks a foreground operation as in flight until dropped.
#[derive(Debug)]
pub struct ActivityGuard {
    gauge: ActivityGauge,
}

impl Drop for ActivityGuard {
    fn drop(&mut self) {
        self.gauge.inner.active.fetch_sub(1, Ordering::SeqCst);
        self.gauge.inner.changed.notify_waiters();
    }
}
