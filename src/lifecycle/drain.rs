//! In-flight relay tracking for graceful shutdown.
//!
//! # Responsibilities
//! - Count relays from the moment a request is accepted until its response
//!   body (streamed or buffered) has been fully handed to the client
//! - Report relays still open when the server stops, so shutdown can
//!   tell a clean drain from an abandoned one

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::observability::metrics;

/// Tracks relays in progress. Cloning shares the same counter.
#[derive(Debug, Clone)]
pub struct InFlight {
    count: Arc<watch::Sender<u64>>,
}

impl InFlight {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self { count: Arc::new(tx) }
    }

    /// Record a new relay. The returned guard releases it on drop, so the
    /// count stays correct on every early-return path.
    pub fn track(&self) -> RelayGuard {
        self.count.send_modify(|n| *n += 1);
        metrics::set_in_flight(*self.count.borrow());
        RelayGuard {
            count: Arc::clone(&self.count),
        }
    }

    /// Relays currently in progress.
    pub fn active(&self) -> u64 {
        *self.count.borrow()
    }

    /// Wait until no relay is in progress, or `timeout` elapses.
    /// Returns `true` if the tracker drained.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let mut rx = self.count.subscribe();
        let drained = tokio::time::timeout(timeout, rx.wait_for(|n| *n == 0))
            .await
            .is_ok();
        drained
    }
}

impl Default for InFlight {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard for one relay in progress.
#[derive(Debug)]
pub struct RelayGuard {
    count: Arc<watch::Sender<u64>>,
}

impl Drop for RelayGuard {
    fn drop(&mut self) {
        self.count.send_modify(|n| *n = n.saturating_sub(1));
        metrics::set_in_flight(*self.count.borrow());
    }
}
