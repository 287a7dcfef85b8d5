//! Worker pool: independent poll loops that claim and analyze entries.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use serde::{Serialize, Serializer};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use fieldscan_protocols::{
    AnalysisContext, Analyzer, ResultSink, WorkItemRepository, WorkItemStatus,
};

use crate::config::PipelineConfig;
use crate::entry::QueueEntry;
use crate::error::QueueError;
use crate::store::QueueStore;

/// Everything a worker talks to. The store is the only shared mutable state.
#[derive(Clone)]
pub struct WorkerContext {
    pub store: Arc<dyn QueueStore>,
    pub items: Arc<dyn WorkItemRepository>,
    pub analyzer: Arc<dyn Analyzer>,
    pub results: Arc<dyn ResultSink>,
}

/// Snapshot of pool counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PoolStats {
    pub entries_completed: u64,
    pub entries_failed: u64,
    /// Workers currently inside an analysis.
    pub active_workers: usize,
    #[serde(rename = "average_entry_ms", serialize_with = "serialize_millis")]
    pub average_entry_duration: Duration,
    /// Store errors hit by the poll loops.
    pub poll_errors: u64,
}

fn serialize_millis<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(value.as_millis() as f64)
}

#[derive(Default)]
struct SharedPoolStats {
    entries_completed: AtomicU64,
    entries_failed: AtomicU64,
    active_workers: AtomicUsize,
    total_duration_ms: AtomicU64,
    poll_errors: AtomicU64,
}

impl SharedPoolStats {
    fn record(&self, outcome: &PollOutcome, elapsed: Duration) {
        match outcome {
            PollOutcome::Completed(_) => self.entries_completed.fetch_add(1, Ordering::Relaxed),
            PollOutcome::Failed(_) => self.entries_failed.fetch_add(1, Ordering::Relaxed),
            PollOutcome::Idle => return,
        };
        self.total_duration_ms
            .fetch_add(elapsed.as_millis() as u64, Ordering::Relaxed);
    }

    fn to_pool_stats(&self) -> PoolStats {
        let completed = self.entries_completed.load(Ordering::Relaxed);
        let failed = self.entries_failed.load(Ordering::Relaxed);
        let processed = completed + failed;
        let average_entry_duration = if processed > 0 {
            Duration::from_millis(self.total_duration_ms.load(Ordering::Relaxed) / processed)
        } else {
            Duration::ZERO
        };

        PoolStats {
            entries_completed: completed,
            entries_failed: failed,
            active_workers: self.active_workers.load(Ordering::Relaxed),
            average_entry_duration,
            poll_errors: self.poll_errors.load(Ordering::Relaxed),
        }
    }
}

/// Decrements the active-worker gauge when the analysis scope ends.
struct ActiveGuard<'a>(&'a AtomicUsize);

impl<'a> ActiveGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(counter)
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Result of one poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Nothing was pending.
    Idle,
    Completed(Uuid),
    Failed(Uuid),
}

/// A single poll loop.
pub struct Worker {
    id: String,
    ctx: WorkerContext,
    poll_interval: Duration,
    stats: Arc<SharedPoolStats>,
}

impl Worker {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Run one cycle: claim at most one entry and drive it to
    /// `completed` or `failed`.
    pub async fn poll_once(&self) -> Result<PollOutcome, QueueError> {
        let entry = match self.ctx.store.dequeue().await {
            Ok(Some(entry)) => entry,
            Ok(None) => return Ok(PollOutcome::Idle),
            Err(e) => {
                self.stats.poll_errors.fetch_add(1, Ordering::Relaxed);
                return Err(e);
            }
        };

        let _active = ActiveGuard::enter(&self.stats.active_workers);
        let started = Instant::now();
        debug!(worker = %self.id, entry_id = %entry.id, work_item_id = %entry.work_item_id, "Claimed entry");

        let outcome = match self.analyze(&entry).await {
            Ok(()) => self.complete(&entry).await,
            Err(message) => self.fail(&entry, &message).await,
        };

        match &outcome {
            Ok(outcome) => self.stats.record(outcome, started.elapsed()),
            Err(_) => {
                self.stats.poll_errors.fetch_add(1, Ordering::Relaxed);
            }
        }
        outcome
    }

    async fn analyze(&self, entry: &QueueEntry) -> Result<(), String> {
        let item = match self.ctx.items.get(&entry.work_item_id).await {
            Ok(Some(item)) => item,
            Ok(None) => return Err(format!("work item {} not found", entry.work_item_id)),
            Err(e) => return Err(format!("work item lookup failed: {e}")),
        };

        let ctx = AnalysisContext::new(entry.id, self.id.clone(), entry.retry_count + 1);
        let result = self
            .ctx
            .analyzer
            .process(&ctx, &item)
            .await
            .map_err(|e| e.to_string())?;

        self.ctx
            .results
            .store(&result)
            .await
            .map_err(|e| format!("failed to store analysis result: {e}"))
    }

    async fn complete(&self, entry: &QueueEntry) -> Result<PollOutcome, QueueError> {
        self.ctx.store.mark_completed(entry).await?;
        info!(worker = %self.id, entry_id = %entry.id, work_item_id = %entry.work_item_id, "Entry completed");

        self.update_item_status(&entry.work_item_id, WorkItemStatus::Processed)
            .await;
        Ok(PollOutcome::Completed(entry.id))
    }

    async fn fail(&self, entry: &QueueEntry, message: &str) -> Result<PollOutcome, QueueError> {
        self.ctx.store.mark_failed(entry, message).await?;
        warn!(
            worker = %self.id,
            entry_id = %entry.id,
            work_item_id = %entry.work_item_id,
            attempt = entry.retry_count + 1,
            error = %message,
            "Entry failed"
        );

        self.update_item_status(&entry.work_item_id, WorkItemStatus::Failed)
            .await;
        Ok(PollOutcome::Failed(entry.id))
    }

    /// Best effort: the queue transition has already been recorded.
    async fn update_item_status(&self, work_item_id: &str, status: WorkItemStatus) {
        if let Err(e) = self.ctx.items.update_status(work_item_id, status).await {
            warn!(worker = %self.id, work_item_id, %status, error = %e, "Failed to update work item status");
        }
    }

    /// Sleep, poll, repeat until cancelled. Cancellation is only observed
    /// between cycles; an in-flight analysis always runs to the end.
    pub async fn run(self, token: CancellationToken) {
        info!(worker = %self.id, "Worker started");

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }

            if let Err(e) = self.poll_once().await {
                error!(worker = %self.id, error = %e, "Poll cycle failed");
            }
        }

        info!(worker = %self.id, "Worker stopped");
    }
}

struct RunState {
    token: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

/// Fixed set of independent workers sharing one store.
pub struct WorkerPool {
    config: PipelineConfig,
    ctx: WorkerContext,
    stats: Arc<SharedPoolStats>,
    running: AtomicBool,
    state: Mutex<Option<RunState>>,
}

impl WorkerPool {
    pub fn new(config: PipelineConfig, ctx: WorkerContext) -> Self {
        Self {
            config,
            ctx,
            stats: Arc::new(SharedPoolStats::default()),
            running: AtomicBool::new(false),
            state: Mutex::new(None),
        }
    }

    /// Build the worker with the given index. Workers share the pool's counters.
    pub fn worker(&self, index: usize) -> Worker {
        Worker {
            id: format!("worker-{index}"),
            ctx: self.ctx.clone(),
            poll_interval: self.config.poll_interval,
            stats: self.stats.clone(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> PoolStats {
        self.stats.to_pool_stats()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Spawn one loop per configured worker. The loops stop when `token`
    /// (or the pool's own shutdown) is cancelled.
    pub async fn start(&self, token: CancellationToken) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        if state.is_some() {
            return Err(QueueError::AlreadyRunning);
        }

        let handles = (1..=self.config.workers)
            .map(|i| tokio::spawn(self.worker(i).run(token.clone())))
            .collect();
        *state = Some(RunState { token, handles });
        self.running.store(true, Ordering::SeqCst);

        info!(
            workers = self.config.workers,
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "Worker pool started"
        );
        Ok(())
    }

    /// Signal every loop and wait for them to finish their current cycle.
    pub async fn shutdown(&self) -> Result<(), QueueError> {
        let Some(RunState { token, handles }) = self.state.lock().await.take() else {
            return Err(QueueError::NotRunning);
        };

        token.cancel();
        let timeout = self.config.shutdown_timeout;
        let joined = tokio::time::timeout(timeout, async {
            let mut panicked = None;
            for handle in handles {
                if let Err(e) = handle.await {
                    error!(error = %e, "Worker task panicked");
                    panicked = Some(e.to_string());
                }
            }
            panicked
        })
        .await;
        self.running.store(false, Ordering::SeqCst);

        match joined {
            Ok(None) => {
                info!("Worker pool stopped");
                Ok(())
            }
            Ok(Some(message)) => Err(QueueError::Worker(message)),
            Err(_) => {
                warn!(timeout_secs = timeout.as_secs(), "Worker pool shutdown timed out");
                Err(QueueError::ShutdownTimeout(timeout))
            }
        }
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
