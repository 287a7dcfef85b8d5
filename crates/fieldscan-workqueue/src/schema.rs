//! Queue database schema.

use rusqlite::Connection;
use tokio_rusqlite::Error;

/// Initialize the queue schema.
pub fn init_schema(conn: &Connection) -> Result<(), Error> {
    conn.execute_batch(SCHEMA)?;

    // Files created before claim tokens existed.
    let has_claim: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM pragma_table_info('queue_entries') WHERE name = 'claim_id'",
        [],
        |row| row.get(0),
    )?;
    if !has_claim {
        conn.execute_batch("ALTER TABLE queue_entries ADD COLUMN claim_id TEXT")?;
    }
    Ok(())
}

// Timestamps are Unix milliseconds. `seq` breaks FIFO ties between entries
// created within the same millisecond.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS queue_entries (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    work_item_id TEXT NOT NULL,
    status TEXT NOT NULL
        CHECK (status IN ('pending', 'processing', 'completed', 'failed')),
    priority TEXT NOT NULL,
    priority_rank INTEGER NOT NULL,
    queued_at_ms INTEGER NOT NULL,
    processed_at_ms INTEGER,
    created_at_ms INTEGER NOT NULL,
    updated_at_ms INTEGER NOT NULL,
    retry_count INTEGER NOT NULL DEFAULT 0 CHECK (retry_count >= 0),
    error_message TEXT,
    -- Token of the current claim; cleared on requeue
    claim_id TEXT
);

-- Claim order: highest tier first, then oldest
CREATE INDEX IF NOT EXISTS idx_queue_claim
    ON queue_entries(status, priority_rank DESC, created_at_ms, seq);

-- Staleness scan and cleanup
CREATE INDEX IF NOT EXISTS idx_queue_status_updated
    ON queue_entries(status, updated_at_ms);
CREATE INDEX IF NOT EXISTS idx_queue_work_item
    ON queue_entries(work_item_id);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'queue_entries'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_init_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
    }

    #[test]
    fn test_init_schema_adds_claim_column() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE queue_entries (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                work_item_id TEXT NOT NULL,
                status TEXT NOT NULL,
                priority TEXT NOT NULL,
                priority_rank INTEGER NOT NULL,
                queued_at_ms INTEGER NOT NULL,
                processed_at_ms INTEGER,
                created_at_ms INTEGER NOT NULL,
                updated_at_ms INTEGER NOT NULL,
                retry_count INTEGER NOT NULL DEFAULT 0,
                error_message TEXT
            );",
        )
        .unwrap();

        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        let columns: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM pragma_table_info('queue_entries') WHERE name = 'claim_id'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(columns, 1);
    }

    #[test]
    fn test_status_check_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO queue_entries
                (id, work_item_id, status, priority, priority_rank, queued_at_ms, created_at_ms, updated_at_ms)
             VALUES ('x', 'att', 'running', 'low', 0, 0, 0, 0)",
            [],
        );
        assert!(result.is_err());
    }
}
