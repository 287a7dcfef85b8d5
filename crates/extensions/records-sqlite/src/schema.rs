use rusqlite::Connection;
use tokio_rusqlite::Error;

pub(crate) fn init_schema(conn: &Connection) -> Result<(), Error> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS work_items (
    id TEXT PRIMARY KEY,
    record_id TEXT,
    file_name TEXT NOT NULL,
    content_type TEXT NOT NULL,
    location TEXT NOT NULL,
    size_bytes INTEGER,
    status TEXT NOT NULL
        CHECK (status IN ('uploaded', 'processed', 'failed')),
    metadata TEXT NOT NULL DEFAULT '{}',
    created_at_ms INTEGER NOT NULL,
    updated_at_ms INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_work_items_record ON work_items(record_id);

CREATE TABLE IF NOT EXISTS analysis_results (
    id TEXT PRIMARY KEY,
    work_item_id TEXT NOT NULL,
    analyzer TEXT NOT NULL,
    summary TEXT NOT NULL,
    labels TEXT NOT NULL DEFAULT '[]',
    confidence REAL,
    details TEXT NOT NULL DEFAULT 'null',
    analyzed_at_ms INTEGER NOT NULL
);

-- Retries append results; readers want the latest first
CREATE INDEX IF NOT EXISTS idx_results_work_item
    ON analysis_results(work_item_id, analyzed_at_ms DESC);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_twice() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' \
                 AND name IN ('work_items', 'analysis_results')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 2);
    }
}
