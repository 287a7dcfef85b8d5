//! SQLite-backed work item repository and result sink.
//!
//! Holds the files waiting for analysis and the results written back by the
//! pipeline. The queue itself lives in a separate table set
//! (see `fieldscan-workqueue`), so both can share one database file.

mod schema;
mod store;

pub use store::SqliteRecordStore;
