//! Store construction from configuration.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use fieldscan_config::StoreConfig;
use fieldscan_protocols::RepositoryError;
use fieldscan_records_sqlite::SqliteRecordStore;
use fieldscan_workqueue::{MemoryQueueStore, QueueError, QueueStore, SqliteQueueStore};

/// Open the queue store selected by `store.backend`.
pub(crate) async fn open_queue_store(
    config: &StoreConfig,
) -> Result<Arc<dyn QueueStore>, QueueError> {
    match config.backend.as_str() {
        "memory" => {
            warn!("Using in-memory queue store; entries are lost on exit");
            Ok(Arc::new(MemoryQueueStore::new()))
        }
        "sqlite" => {
            let path = config.resolved_path();
            let store = SqliteQueueStore::open_with_timeout(
                &path,
                Duration::from_millis(config.busy_timeout_ms),
            )
            .await?;
            info!(path = %path.display(), "Queue store ready");
            Ok(Arc::new(store))
        }
        other => Err(QueueError::Database(format!("unknown store backend: {other}"))),
    }
}

/// Work items and results always live in the SQLite file, whatever the
/// queue backend.
pub(crate) async fn open_record_store(
    config: &StoreConfig,
) -> Result<SqliteRecordStore, RepositoryError> {
    SqliteRecordStore::open_with_timeout(
        config.resolved_path(),
        Duration::from_millis(config.busy_timeout_ms),
    )
    .await
}
