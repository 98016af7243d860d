//! Background job: re-run the listing sync on a fixed interval.
//!
//! This is the retry path for failed runs. The orchestrator itself never
//! retries; a failed tick is logged and the next one starts from scratch.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};

use crate::meli::sync::SyncOrchestrator;

/// Spawn the scheduled sync task. Call this once at startup.
/// The first run starts immediately.
pub fn spawn(orchestrator: Arc<SyncOrchestrator>, every: Duration) {
    tokio::spawn(async move {
        let mut interval = time::interval(every);
        // Slow runs push the schedule back; no catch-up runs.
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            match orchestrator.run_sync().await {
                Ok(report) => tracing::info!(
                    count = report.count,
                    failed = report.failures.len(),
                    "scheduled sync finished"
                ),
                Err(e) => tracing::error!("scheduled sync failed: {}", e),
            }
        }
    });
}
