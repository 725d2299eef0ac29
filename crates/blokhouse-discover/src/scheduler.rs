//! Discovery scheduling.
//!
//! Runs a discovery cycle on a fixed interval. A failed cycle is logged and
//! retried at the next tick; nothing here stops the loop except shutdown.

use std::future::Future;
use std::sync::Arc;

use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::reconcile::DiscoveryReconciler;

/// Periodically triggers discovery cycles on a shared reconciler.
pub struct DiscoveryScheduler {
    reconciler: Arc<DiscoveryReconciler>,
    every: Duration,
}

impl DiscoveryScheduler {
    pub fn new(reconciler: Arc<DiscoveryReconciler>, every: Duration) -> Self {
        Self { reconciler, every }
    }

    /// Run cycles until `shutdown` resolves. The first cycle starts immediately.
    pub async fn run_until(&self, shutdown: impl Future<Output = ()>) {
        tokio::select! {
            _ = self.run() => {}
            _ = shutdown => {
                tracing::info!("Discovery scheduler shutting down");
            }
        }
    }

    /// Run cycles forever.
    pub async fn run(&self) {
        let mut ticker = interval(self.every);
        // A cycle that overruns the interval should not trigger a burst of catch-up scans.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(interval_secs = self.every.as_secs(), "Scheduler started");

        loop {
            ticker.tick().await;

            tracing::info!("Scheduled discovery cycle triggered");

            if let Err(e) = self.reconciler.run_cycle().await {
                tracing::error!(error = %e, "Scheduled discovery cycle failed");
            }
        }
    }
}
