//! Pipeline facade: one store, one worker pool, three maintenance loops.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::PipelineConfig;
use crate::entry::{EntryPriority, QueueEntry};
use crate::error::QueueError;
use crate::maintenance::{CleanupWorker, RetryCoordinator, StalenessMonitor};
use crate::stats::QueueStats;
use crate::store::QueueStore;
use crate::worker::{PoolStats, WorkerContext, WorkerPool};

struct Running {
    token: CancellationToken,
    maintenance: Vec<JoinHandle<()>>,
}

/// Asynchronous analysis pipeline.
///
/// Ingestion calls [`Pipeline::enqueue`]; everything else happens in the
/// background between [`Pipeline::start`] and [`Pipeline::shutdown`].
pub struct Pipeline {
    config: PipelineConfig,
    store: Arc<dyn QueueStore>,
    pool: WorkerPool,
    running: Mutex<Option<Running>>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, ctx: WorkerContext) -> Self {
        let store = ctx.store.clone();
        Self {
            pool: WorkerPool::new(config.clone(), ctx),
            config,
            store,
            running: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn QueueStore> {
        &self.store
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn is_running(&self) -> bool {
        self.pool.is_running()
    }

    /// Spawn the worker loops and the maintenance tasks.
    pub async fn start(&self) -> Result<(), QueueError> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(QueueError::AlreadyRunning);
        }

        let token = CancellationToken::new();
        self.pool.start(token.child_token()).await?;

        let monitor = StalenessMonitor::from_config(self.store.clone(), &self.config);
        let retry = RetryCoordinator::from_config(self.store.clone(), &self.config);
        let cleanup = CleanupWorker::from_config(self.store.clone(), &self.config);
        let maintenance = vec![
            tokio::spawn(monitor.run(token.child_token())),
            tokio::spawn(retry.run(token.child_token())),
            tokio::spawn(cleanup.run(token.child_token())),
        ];

        *running = Some(Running { token, maintenance });
        info!(
            workers = self.config.workers,
            max_retries = self.config.max_retries,
            stale_after_secs = self.config.stale_after.as_secs(),
            "Pipeline started"
        );
        Ok(())
    }

    /// Cancel every loop and wait for in-flight cycles to finish.
    pub async fn shutdown(&self) -> Result<(), QueueError> {
        let Some(Running { token, maintenance }) = self.running.lock().await.take() else {
            return Err(QueueError::NotRunning);
        };

        info!("Pipeline shutting down");
        token.cancel();
        let pool_result = self.pool.shutdown().await;

        let timeout = self.config.shutdown_timeout;
        let maintenance_result = tokio::time::timeout(timeout, async {
            for handle in maintenance {
                if let Err(e) = handle.await {
                    error!(error = %e, "Maintenance task panicked");
                }
            }
        })
        .await
        .map_err(|_| QueueError::ShutdownTimeout(timeout));

        pool_result.and(maintenance_result)?;
        info!("Pipeline stopped");
        Ok(())
    }

    /// Ingestion entrypoint.
    pub async fn enqueue(
        &self,
        work_item_id: &str,
        priority: EntryPriority,
    ) -> Result<QueueEntry, QueueError> {
        let entry = self.store.enqueue(work_item_id, priority).await?;
        info!(entry_id = %entry.id, work_item_id, %priority, "Work item queued for analysis");
        Ok(entry)
    }

    pub async fn stats(&self) -> Result<QueueStats, QueueError> {
        self.store.stats(self.config.max_retries).await
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }
}
