//! SQLite-backed queue store.
//!
//! The claim runs as a single `UPDATE ... RETURNING` inside a
//! `BEGIN IMMEDIATE` transaction. Any number of connections (in this process
//! or another one sharing the file) serialize on the database write lock, so
//! every pending row has at most one claimer. The busy timeout turns lock
//! contention into a short wait instead of `SQLITE_BUSY`.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, TransactionBehavior, params};
use tokio_rusqlite::Connection;
use tracing::debug;
use uuid::Uuid;

use crate::entry::{EntryPriority, EntryStatus, QueueEntry};
use crate::error::QueueError;
use crate::schema::init_schema;
use crate::stats::QueueStats;
use crate::store::{QueueStore, cutoff};

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const ENTRY_COLUMNS: &str = "id, work_item_id, status, priority, queued_at_ms, processed_at_ms, \
     created_at_ms, updated_at_ms, retry_count, error_message, claim_id";

/// Durable queue store on a SQLite database file.
#[derive(Clone)]
pub struct SqliteQueueStore {
    conn: Connection,
}

impl SqliteQueueStore {
    /// Open (or create) a file-backed queue.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, QueueError> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT).await
    }

    /// Open with an explicit busy timeout for write-lock contention.
    pub async fn open_with_timeout(
        path: impl AsRef<Path>,
        busy_timeout: Duration,
    ) -> Result<Self, QueueError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                QueueError::Database(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let conn = Connection::open(&path).await?;
        conn.call(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            let _mode: String =
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
            init_schema(conn)
        })
        .await?;

        debug!(path = %path.display(), "Opened SQLite queue store");
        Ok(Self { conn })
    }

    /// Create a private in-memory queue.
    pub async fn in_memory() -> Result<Self, QueueError> {
        let conn = Connection::open_in_memory().await?;
        conn.call(|conn| init_schema(conn)).await?;
        Ok(Self { conn })
    }

    /// Run a guarded `processing -> to` update for the holder of `claimed`.
    /// `?1` is the ID, `?2` the current time, `?3` the claim token and `?4`
    /// the optional message.
    async fn transition(
        &self,
        claimed: &QueueEntry,
        to: EntryStatus,
        sql: &'static str,
        message: Option<String>,
    ) -> Result<(), QueueError> {
        let id = claimed.id;
        let now_ms = dt_to_ms(Utc::now());
        let key = id.to_string();
        let claim = claimed.claim_id.map(|c| c.to_string());

        let current = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let changed = match &message {
                    Some(message) => tx.execute(sql, params![key, now_ms, claim, message])?,
                    None => tx.execute(sql, params![key, now_ms, claim])?,
                };
                let current = if changed == 0 {
                    Some(
                        tx.query_row(
                            "SELECT status FROM queue_entries WHERE id = ?1",
                            [&key],
                            |row| row.get::<_, String>(0),
                        )
                        .optional()?,
                    )
                } else {
                    None
                };
                tx.commit()?;
                Ok(current)
            })
            .await?;

        match current {
            None => Ok(()),
            Some(None) => Err(QueueError::EntryNotFound(id)),
            Some(Some(from)) => match EntryStatus::parse(&from)? {
                EntryStatus::Processing => Err(QueueError::StaleClaim(id)),
                from => Err(QueueError::InvalidTransition { id, from, to }),
            },
        }
    }

    async fn select_entries(
        &self,
        sql: String,
        args: Vec<rusqlite::types::Value>,
    ) -> Result<Vec<QueueEntry>, QueueError> {
        let rows = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(rusqlite::params_from_iter(args), RawEntry::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;
        rows.into_iter().map(QueueEntry::try_from).collect()
    }
}

#[async_trait]
impl QueueStore for SqliteQueueStore {
    async fn enqueue(
        &self,
        work_item_id: &str,
        priority: EntryPriority,
    ) -> Result<QueueEntry, QueueError> {
        let mut entry = QueueEntry::new(work_item_id, priority);
        let now = truncate_ms(entry.created_at)?;
        entry.created_at = now;
        entry.queued_at = now;
        entry.updated_at = now;

        let row = entry.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO queue_entries
                        (id, work_item_id, status, priority, priority_rank,
                         queued_at_ms, created_at_ms, updated_at_ms, retry_count)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, ?6, 0)",
                    params![
                        row.id.to_string(),
                        row.work_item_id,
                        row.status.as_str(),
                        row.priority.as_str(),
                        row.priority.rank(),
                        dt_to_ms(now),
                    ],
                )?;
                Ok(())
            })
            .await?;

        debug!(entry_id = %entry.id, work_item_id = %entry.work_item_id, priority = %priority, "Enqueued entry");
        Ok(entry)
    }

    async fn dequeue(&self) -> Result<Option<QueueEntry>, QueueError> {
        let now_ms = dt_to_ms(Utc::now());
        let claim = Uuid::new_v4().to_string();
        let sql = format!(
            "UPDATE queue_entries
             SET status = 'processing', updated_at_ms = ?1, claim_id = ?2
             WHERE id = (
                 SELECT id FROM queue_entries
                 WHERE status = 'pending'
                 ORDER BY priority_rank DESC, created_at_ms ASC, seq ASC
                 LIMIT 1
             )
             AND status = 'pending'
             RETURNING {ENTRY_COLUMNS}"
        );

        let raw = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let raw = tx
                    .query_row(&sql, params![now_ms, claim], RawEntry::from_row)
                    .optional()?;
                tx.commit()?;
                Ok(raw)
            })
            .await?;

        raw.map(QueueEntry::try_from).transpose()
    }

    async fn mark_completed(&self, claimed: &QueueEntry) -> Result<(), QueueError> {
        self.transition(
            claimed,
            EntryStatus::Completed,
            "UPDATE queue_entries
             SET status = 'completed', processed_at_ms = ?2, updated_at_ms = ?2
             WHERE id = ?1 AND status = 'processing' AND claim_id IS ?3",
            None,
        )
        .await
    }

    async fn mark_failed(&self, claimed: &QueueEntry, message: &str) -> Result<(), QueueError> {
        self.transition(
            claimed,
            EntryStatus::Failed,
            "UPDATE queue_entries
             SET status = 'failed', error_message = ?4, retry_count = retry_count + 1,
                 processed_at_ms = ?2, updated_at_ms = ?2
             WHERE id = ?1 AND status = 'processing' AND claim_id IS ?3",
            Some(message.to_string()),
        )
        .await
    }

    async fn retry_failed(&self, max_retries: u32) -> Result<u64, QueueError> {
        let now_ms = dt_to_ms(Utc::now());
        let changed = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    "UPDATE queue_entries
                     SET status = 'pending', error_message = NULL, processed_at_ms = NULL,
                         claim_id = NULL, queued_at_ms = ?2, updated_at_ms = ?2
                     WHERE status = 'failed' AND retry_count < ?1",
                    params![max_retries, now_ms],
                )?;
                Ok(changed)
            })
            .await?;
        Ok(changed as u64)
    }

    async fn cleanup_completed(&self, older_than: Duration) -> Result<u64, QueueError> {
        let cutoff_ms = dt_to_ms(cutoff(Utc::now(), older_than)?);
        let deleted = self
            .conn
            .call(move |conn| {
                let deleted = conn.execute(
                    "DELETE FROM queue_entries
                     WHERE status = 'completed' AND processed_at_ms < ?1",
                    [cutoff_ms],
                )?;
                Ok(deleted)
            })
            .await?;
        Ok(deleted as u64)
    }

    async fn get_stale_processing_items(
        &self,
        stale_after: Duration,
    ) -> Result<Vec<QueueEntry>, QueueError> {
        let cutoff_ms = dt_to_ms(cutoff(Utc::now(), stale_after)?);
        self.select_entries(
            format!(
                "SELECT {ENTRY_COLUMNS} FROM queue_entries
                 WHERE status = 'processing' AND updated_at_ms < ?1
                 ORDER BY updated_at_ms"
            ),
            vec![cutoff_ms.into()],
        )
        .await
    }

    async fn get(&self, id: Uuid) -> Result<Option<QueueEntry>, QueueError> {
        let mut rows = self
            .select_entries(
                format!("SELECT {ENTRY_COLUMNS} FROM queue_entries WHERE id = ?1"),
                vec![id.to_string().into()],
            )
            .await?;
        Ok(rows.pop())
    }

    async fn list(
        &self,
        status: Option<EntryStatus>,
        limit: usize,
    ) -> Result<Vec<QueueEntry>, QueueError> {
        let status: rusqlite::types::Value = match status {
            Some(status) => status.as_str().to_string().into(),
            None => rusqlite::types::Value::Null,
        };
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.select_entries(
            format!(
                "SELECT {ENTRY_COLUMNS} FROM queue_entries
                 WHERE (?1 IS NULL OR status = ?1)
                 ORDER BY priority_rank DESC, created_at_ms ASC, seq ASC
                 LIMIT ?2"
            ),
            vec![status, limit.into()],
        )
        .await
    }

    async fn stats(&self, max_retries: u32) -> Result<QueueStats, QueueError> {
        let (counts, avg, exhausted, oldest_ms) = self
            .conn
            .call(move |conn| {
                let mut stmt =
                    conn.prepare("SELECT status, COUNT(*) FROM queue_entries GROUP BY status")?;
                let counts = stmt
                    .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
                    .collect::<Result<Vec<_>, _>>()?;

                let avg: Option<f64> = conn.query_row(
                    "SELECT AVG(processed_at_ms - queued_at_ms) FROM queue_entries
                     WHERE status = 'completed' AND processed_at_ms IS NOT NULL",
                    [],
                    |row| row.get(0),
                )?;
                let exhausted: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM queue_entries
                     WHERE status = 'failed' AND retry_count >= ?1",
                    [max_retries],
                    |row| row.get(0),
                )?;
                let oldest_ms: Option<i64> = conn.query_row(
                    "SELECT MIN(queued_at_ms) FROM queue_entries WHERE status = 'pending'",
                    [],
                    |row| row.get(0),
                )?;
                Ok((counts, avg, exhausted, oldest_ms))
            })
            .await?;

        let mut stats = QueueStats {
            avg_processing_ms: avg,
            exhausted: exhausted as u64,
            oldest_pending_queued_at: oldest_ms.map(ms_to_dt).transpose()?,
            ..Default::default()
        };
        for (status, count) in counts {
            stats.add(EntryStatus::parse(&status)?, count as u64);
        }
        Ok(stats)
    }
}

/// Column values as stored, before mapping into domain types.
struct RawEntry {
    id: String,
    work_item_id: String,
    status: String,
    priority: String,
    queued_at_ms: i64,
    processed_at_ms: Option<i64>,
    created_at_ms: i64,
    updated_at_ms: i64,
    retry_count: i64,
    error_message: Option<String>,
    claim_id: Option<String>,
}

impl RawEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            work_item_id: row.get(1)?,
            status: row.get(2)?,
            priority: row.get(3)?,
            queued_at_ms: row.get(4)?,
            processed_at_ms: row.get(5)?,
            created_at_ms: row.get(6)?,
            updated_at_ms: row.get(7)?,
            retry_count: row.get(8)?,
            error_message: row.get(9)?,
            claim_id: row.get(10)?,
        })
    }
}

impl TryFrom<RawEntry> for QueueEntry {
    type Error = QueueError;

    fn try_from(raw: RawEntry) -> Result<Self, Self::Error> {
        Ok(QueueEntry {
            id: Uuid::parse_str(&raw.id)
                .map_err(|e| QueueError::Mapping(format!("invalid entry id '{}': {e}", raw.id)))?,
            work_item_id: raw.work_item_id,
            status: EntryStatus::parse(&raw.status)?,
            priority: EntryPriority::parse(&raw.priority)?,
            queued_at: ms_to_dt(raw.queued_at_ms)?,
            processed_at: raw.processed_at_ms.map(ms_to_dt).transpose()?,
            created_at: ms_to_dt(raw.created_at_ms)?,
            updated_at: ms_to_dt(raw.updated_at_ms)?,
            retry_count: u32::try_from(raw.retry_count).map_err(|_| {
                QueueError::Mapping(format!("invalid retry count {}", raw.retry_count))
            })?,
            error_message: raw.error_message,
            claim_id: raw
                .claim_id
                .map(|c| {
                    Uuid::parse_str(&c)
                        .map_err(|e| QueueError::Mapping(format!("invalid claim id '{c}': {e}")))
                })
                .transpose()?,
        })
    }
}

fn dt_to_ms(dt: DateTime<Utc>) -> i64 {
    dt.timestamp_millis()
}

fn ms_to_dt(ms: i64) -> Result<DateTime<Utc>, QueueError> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| QueueError::Mapping(format!("invalid timestamp {ms}")))
}

fn truncate_ms(dt: DateTime<Utc>) -> Result<DateTime<Utc>, QueueError> {
    ms_to_dt(dt_to_ms(dt))
}

#[cfg(test)]
#[path = "sqlite_tests.rs"]
mod tests;
