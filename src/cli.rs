//! CLI definitions for fieldscan.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// fieldscan CLI.
#[derive(Parser)]
#[command(name = "fieldscan")]
#[command(about = "Asynchronous analysis pipeline for service-record attachments")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/fieldscan.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run the pipeline and the stats server in foreground (default)
    Run {
        /// Override `queue.workers`
        #[arg(long)]
        workers: Option<u32>,
    },

    /// Queue a work item for analysis
    Enqueue {
        /// Work item ID
        work_item_id: String,

        /// Priority (low, medium, high, urgent)
        #[arg(long, default_value = "medium")]
        priority: String,
    },

    /// Show queue statistics
    Stats {
        /// Output format (table, json)
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// List queue entries in dequeue order
    List {
        /// Only entries with this status
        #[arg(long)]
        status: Option<String>,

        #[arg(long, default_value_t = 50)]
        limit: usize,

        /// Output format (table, json)
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Requeue failed entries that still have retry budget
    Retry {
        /// Override `queue.max_retries`
        #[arg(long)]
        max_retries: Option<u32>,
    },

    /// Delete completed entries older than the retention period
    Cleanup {
        /// Override `queue.retention_secs`
        #[arg(long)]
        retention_secs: Option<u64>,
    },

    /// Fail entries stuck in processing
    Reclaim {
        /// Override `queue.stale_after_secs`
        #[arg(long)]
        stale_after_secs: Option<u64>,
    },

    /// Work item commands
    Item {
        #[command(subcommand)]
        action: ItemAction,
    },
}

#[derive(Subcommand)]
pub(crate) enum ItemAction {
    /// Register a work item in the record store
    Add {
        /// Work item ID
        id: String,

        /// File path or URL
        path: String,

        /// MIME type
        #[arg(long, default_value = "image/jpeg")]
        content_type: String,

        /// Service record the file belongs to
        #[arg(long)]
        record: Option<String>,
    },

    /// Show a work item and its analysis results
    Show {
        /// Work item ID
        id: String,
    },
}
