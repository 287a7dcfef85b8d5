//! Periodic maintenance: staleness reclaim, retries and cleanup.
//!
//! Each task is an independent loop driven by its own interval. A failing
//! tick is logged and the loop carries on; the next tick retries.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::PipelineConfig;
use crate::error::QueueError;
use crate::store::QueueStore;

/// Failure message recorded on reclaimed entries.
pub const STALE_MESSAGE: &str = "processing timed out";

async fn run_every<F, Fut>(name: &'static str, interval: Duration, token: CancellationToken, mut tick: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<u64, QueueError>>,
{
    info!(task = name, interval_ms = interval.as_millis() as u64, "Starting maintenance loop");

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {
                match tick().await {
                    Ok(0) => {}
                    Ok(n) => debug!(task = name, affected = n, "Maintenance tick"),
                    Err(e) => error!(task = name, error = %e, "Maintenance tick failed"),
                }
            }
            _ = token.cancelled() => {
                info!(task = name, "Maintenance loop shutting down");
                break;
            }
        }
    }
}

/// Returns abandoned `processing` entries to `failed`.
pub struct StalenessMonitor {
    store: Arc<dyn QueueStore>,
    stale_after: Duration,
    interval: Duration,
}

impl StalenessMonitor {
    pub fn new(store: Arc<dyn QueueStore>, stale_after: Duration, interval: Duration) -> Self {
        Self {
            store,
            stale_after,
            interval,
        }
    }

    pub fn from_config(store: Arc<dyn QueueStore>, config: &PipelineConfig) -> Self {
        Self::new(store, config.stale_after, config.stale_check_interval)
    }

    /// Reclaim every stale entry once. Returns how many were marked failed.
    pub async fn tick(&self) -> Result<u64, QueueError> {
        let stale = self.store.get_stale_processing_items(self.stale_after).await?;
        let mut reclaimed = 0;

        for entry in stale {
            match self.store.mark_failed(&entry, STALE_MESSAGE).await {
                Ok(()) => {
                    warn!(
                        entry_id = %entry.id,
                        work_item_id = %entry.work_item_id,
                        since = %entry.updated_at,
                        "Reclaimed stale entry"
                    );
                    reclaimed += 1;
                }
                // Finished, or reclaimed by another monitor, between the
                // scan and the update.
                Err(QueueError::InvalidTransition { .. } | QueueError::StaleClaim(_)) => {
                    debug!(entry_id = %entry.id, "Stale entry already left processing");
                }
                Err(e) => {
                    error!(entry_id = %entry.id, error = %e, "Failed to reclaim stale entry");
                }
            }
        }

        Ok(reclaimed)
    }

    pub async fn run(self, token: CancellationToken) {
        run_every("staleness-monitor", self.interval, token, || self.tick()).await;
    }
}

/// Requeues failed entries that still have retry budget.
pub struct RetryCoordinator {
    store: Arc<dyn QueueStore>,
    max_retries: u32,
    interval: Duration,
}

impl RetryCoordinator {
    pub fn new(store: Arc<dyn QueueStore>, max_retries: u32, interval: Duration) -> Self {
        Self {
            store,
            max_retries,
            interval,
        }
    }

    pub fn from_config(store: Arc<dyn QueueStore>, config: &PipelineConfig) -> Self {
        Self::new(store, config.max_retries, config.retry_interval)
    }

    pub async fn tick(&self) -> Result<u64, QueueError> {
        let requeued = self.store.retry_failed(self.max_retries).await?;
        if requeued > 0 {
            info!(requeued, max_retries = self.max_retries, "Requeued failed entries");
        }
        Ok(requeued)
    }

    pub async fn run(self, token: CancellationToken) {
        run_every("retry-coordinator", self.interval, token, || self.tick()).await;
    }
}

/// Deletes completed entries past the retention window.
pub struct CleanupWorker {
    store: Arc<dyn QueueStore>,
    retention: Duration,
    interval: Duration,
}

impl CleanupWorker {
    pub fn new(store: Arc<dyn QueueStore>, retention: Duration, interval: Duration) -> Self {
        Self {
            store,
            retention,
            interval,
        }
    }

    pub fn from_config(store: Arc<dyn QueueStore>, config: &PipelineConfig) -> Self {
        Self::new(store, config.retention, config.cleanup_interval)
    }

    pub async fn tick(&self) -> Result<u64, QueueError> {
        let deleted = self.store.cleanup_completed(self.retention).await?;
        if deleted > 0 {
            info!(deleted, "Cleaned up completed entries");
        }
        Ok(deleted)
    }

    pub async fn run(self, token: CancellationToken) {
        run_every("cleanup-worker", self.interval, token, || self.tick()).await;
    }
}

#[cfg(test)]
#[path = "maintenance_tests.rs"]
mod tests;
