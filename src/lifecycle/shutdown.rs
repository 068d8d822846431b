//! Shutdown latch for the relay.
//!
//! Once triggered it stays triggered: a task that starts waiting after the
//! signal (the drain deadline, a late test helper) still sees it.

use std::sync::Arc;

use tokio::sync::watch;

/// Cloneable handle to the process-wide shutdown latch.
#[derive(Debug, Clone)]
pub struct Shutdown {
    latch: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { latch: Arc::new(tx) }
    }

    /// Flip the latch. Later calls are no-ops.
    pub fn trigger(&self) {
        if !self.latch.send_replace(true) {
            tracing::info!("Shutdown triggered");
        }
    }

    pub fn is_triggered(&self) -> bool {
        *self.latch.borrow()
    }

    /// Resolve once the latch is flipped.
    pub async fn wait(&self) {
        let mut rx = self.latch.subscribe();
        // The sender lives as long as `self`, so this only returns on trigger.
        let _ = rx.wait_for(|triggered| *triggered).await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
