//! Idle-time schedulers.

use async_trait::async_trait;
use kiosko_abstraction::{ActivityGauge, IdleScheduler};
use std::time::Duration;

/// Considers the host idle once no foreground load is in flight.
#[derive(Debug, Clone)]
pub struct ActivityIdleScheduler {
    gauge: ActivityGauge,
}

impl ActivityIdleScheduler {
    /// Creates a scheduler watching `gauge`.
    #[must_use]
    pub fn new(gauge: ActivityGauge) -> Self {
        Self { gauge }
    }
}

#[async_trait]
impl IdleScheduler for ActivityIdleScheduler {
    async fn idle(&self, deadline: Duration) {
        // Never run inline: let already-scheduled work go first.
        tokio::task::yield_now().await;
        let _ = tokio::time::timeout(deadline, self.gauge.wait_idle()).await;
    }
}

/// Fallback for hosts without idle detection: waits a short fixed delay.
#[derive(Debug, Clone)]
pub struct FixedDelayIdle {
    delay: Duration,
}

impl FixedDelayIdle {
    /// Creates a scheduler that always waits `delay` (capped by the deadline).
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for FixedDelayIdle {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}

#[async_trait]
impl IdleScheduler for FixedDelayIdle {
    async fn idle(&self, deadline: Duration) {
        tokio::time::sleep(self.delay.min(deadline)).await;
    }
}
