use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};
use tokio_rusqlite::Connection;
use tracing::debug;
use uuid::Uuid;

use fieldscan_protocols::{
    AnalysisResult, RepositoryError, ResultSink, WorkItem, WorkItemRepository, WorkItemStatus,
};

use crate::schema::init_schema;

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const ITEM_COLUMNS: &str = "id, record_id, file_name, content_type, location, size_bytes, \
     status, metadata, created_at_ms";

const RESULT_COLUMNS: &str =
    "id, work_item_id, analyzer, summary, labels, confidence, details, analyzed_at_ms";

/// Work items and analysis results in a SQLite database.
#[derive(Clone)]
pub struct SqliteRecordStore {
    conn: Connection,
}

impl SqliteRecordStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT).await
    }

    pub async fn open_with_timeout(
        path: impl AsRef<Path>,
        busy_timeout: Duration,
    ) -> Result<Self, RepositoryError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                RepositoryError::Database(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let conn = Connection::open(&path).await.map_err(db_err)?;
        conn.call(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            let _mode: String =
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
            init_schema(conn)
        })
        .await
        .map_err(db_err)?;

        debug!(path = %path.display(), "Opened SQLite record store");
        Ok(Self { conn })
    }

    pub async fn in_memory() -> Result<Self, RepositoryError> {
        let conn = Connection::open_in_memory().await.map_err(db_err)?;
        conn.call(|conn| init_schema(conn)).await.map_err(db_err)?;
        Ok(Self { conn })
    }

    /// Register a new work item. Fails if the ID already exists.
    pub async fn insert(&self, item: &WorkItem) -> Result<(), RepositoryError> {
        let metadata = serde_json::to_string(&item.metadata)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        let item = item.clone();
        let created_ms = item.created_at.timestamp_millis();
        let now_ms = Utc::now().timestamp_millis();

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO work_items (id, record_id, file_name, content_type, location, \
                     size_bytes, status, metadata, created_at_ms, updated_at_ms) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    params![
                        item.id,
                        item.record_id,
                        item.file_name,
                        item.content_type,
                        item.location,
                        item.size_bytes.map(|s| s as i64),
                        item.status.as_str(),
                        metadata,
                        created_ms,
                        now_ms,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(db_err)
    }

    /// Results recorded for a work item, newest first.
    pub async fn results_for(&self, work_item_id: &str) -> Result<Vec<AnalysisResult>, RepositoryError> {
        let key = work_item_id.to_string();
        let rows = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {RESULT_COLUMNS} FROM analysis_results \
                     WHERE work_item_id = ?1 ORDER BY analyzed_at_ms DESC"
                ))?;
                let rows = stmt
                    .query_map([key], RawResult::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(db_err)?;
        rows.into_iter().map(RawResult::into_result).collect()
    }
}

#[async_trait]
impl WorkItemRepository for SqliteRecordStore {
    async fn get(&self, id: &str) -> Result<Option<WorkItem>, RepositoryError> {
        let key = id.to_string();
        let raw = self
            .conn
            .call(move |conn| {
                let row = conn
                    .query_row(
                        &format!("SELECT {ITEM_COLUMNS} FROM work_items WHERE id = ?1"),
                        [key],
                        RawItem::from_row,
                    )
                    .optional()?;
                Ok(row)
            })
            .await
            .map_err(db_err)?;
        raw.map(RawItem::into_item).transpose()
    }

    async fn update_status(&self, id: &str, status: WorkItemStatus) -> Result<(), RepositoryError> {
        let key = id.to_string();
        let now_ms = Utc::now().timestamp_millis();
        let changed = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    "UPDATE work_items SET status = ?2, updated_at_ms = ?3 WHERE id = ?1",
                    params![key, status.as_str(), now_ms],
                )?;
                Ok(changed)
            })
            .await
            .map_err(db_err)?;

        if changed == 0 {
            return Err(RepositoryError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ResultSink for SqliteRecordStore {
    async fn store(&self, result: &AnalysisResult) -> Result<(), RepositoryError> {
        let labels = serde_json::to_string(&result.labels)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        let details = serde_json::to_string(&result.details)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        let result = result.clone();

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO analysis_results (id, work_item_id, analyzer, summary, labels, \
                     confidence, details, analyzed_at_ms) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        result.id.to_string(),
                        result.work_item_id,
                        result.analyzer,
                        result.summary,
                        labels,
                        result.confidence.map(f64::from),
                        details,
                        result.analyzed_at.timestamp_millis(),
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(db_err)
    }
}

fn db_err(e: tokio_rusqlite::Error) -> RepositoryError {
    RepositoryError::Database(e.to_string())
}

fn ms_to_dt(ms: i64) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| RepositoryError::Serialization(format!("timestamp out of range: {ms}")))
}

fn parse_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, RepositoryError> {
    serde_json::from_str(raw).map_err(|e| RepositoryError::Serialization(e.to_string()))
}

struct RawItem {
    id: String,
    record_id: Option<String>,
    file_name: String,
    content_type: String,
    location: String,
    size_bytes: Option<i64>,
    status: String,
    metadata: String,
    created_at_ms: i64,
}

impl RawItem {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            record_id: row.get(1)?,
            file_name: row.get(2)?,
            content_type: row.get(3)?,
            location: row.get(4)?,
            size_bytes: row.get(5)?,
            status: row.get(6)?,
            metadata: row.get(7)?,
            created_at_ms: row.get(8)?,
        })
    }

    fn into_item(self) -> Result<WorkItem, RepositoryError> {
        let status = WorkItemStatus::parse(&self.status).ok_or_else(|| {
            RepositoryError::Serialization(format!("unknown work item status: {}", self.status))
        })?;
        Ok(WorkItem {
            id: self.id,
            record_id: self.record_id,
            file_name: self.file_name,
            content_type: self.content_type,
            location: self.location,
            size_bytes: self.size_bytes.map(|s| s as u64),
            status,
            metadata: parse_json(&self.metadata)?,
            created_at: ms_to_dt(self.created_at_ms)?,
        })
    }
}

struct RawResult {
    id: String,
    work_item_id: String,
    analyzer: String,
    summary: String,
    labels: String,
    confidence: Option<f64>,
    details: String,
    analyzed_at_ms: i64,
}

impl RawResult {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            work_item_id: row.get(1)?,
            analyzer: row.get(2)?,
            summary: row.get(3)?,
            labels: row.get(4)?,
            confidence: row.get(5)?,
            details: row.get(6)?,
            analyzed_at_ms: row.get(7)?,
        })
    }

    fn into_result(self) -> Result<AnalysisResult, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Serialization(format!("invalid result id: {e}")))?;
        Ok(AnalysisResult {
            id,
            work_item_id: self.work_item_id,
            analyzer: self.analyzer,
            summary: self.summary,
            labels: parse_json(&self.labels)?,
            confidence: self.confidence.map(|c| c as f32),
            details: parse_json(&self.details)?,
            analyzed_at: ms_to_dt(self.analyzed_at_ms)?,
        })
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
