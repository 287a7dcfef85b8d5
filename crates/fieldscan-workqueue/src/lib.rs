//! # fieldscan Work Queue
//!
//! Durable, priority-ordered work queue and the worker pool that drains it.
//!
//! ## Features
//!
//! - Four priority tiers, FIFO within a tier
//! - Atomic claim, safe for any number of concurrent workers
//! - SQLite persistence (plus an in-memory store for single-process use)
//! - Bounded retries and reclaim of abandoned claims
//! - Periodic cleanup of completed entries

pub mod config;
pub mod entry;
pub mod error;
pub mod maintenance;
pub mod pipeline;
pub mod schema;
pub mod sqlite;
pub mod stats;
pub mod store;
pub mod worker;

pub use config::PipelineConfig;
pub use entry::{EntryPriority, EntryStatus, QueueEntry};
pub use error::QueueError;
pub use maintenance::{CleanupWorker, RetryCoordinator, STALE_MESSAGE, StalenessMonitor};
pub use pipeline::Pipeline;
pub use sqlite::SqliteQueueStore;
pub use stats::QueueStats;
pub use store::{MemoryQueueStore, QueueStore};
pub use worker::{PollOutcome, PoolStats, Worker, WorkerContext, WorkerPool};
