//! One-shot queue administration commands.

use std::time::Duration;

use tracing::{info, warn};

use fieldscan_config::Config;
use fieldscan_protocols::WorkItemRepository;
use fieldscan_workqueue::{
    CleanupWorker, EntryPriority, EntryStatus, QueueEntry, QueueStats, RetryCoordinator,
    StalenessMonitor,
};

use crate::stores::{open_queue_store, open_record_store};

/// Queue a work item.
pub(crate) async fn enqueue(
    config: &Config,
    work_item_id: &str,
    priority: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let priority = EntryPriority::parse(priority)?;

    let records = open_record_store(&config.store).await?;
    if records.get(work_item_id).await?.is_none() {
        warn!(work_item_id, "Work item is not registered; the entry will fail until it is");
    }

    let store = open_queue_store(&config.store).await?;
    let entry = store.enqueue(work_item_id, priority).await?;
    println!("Queued {} ({}) as entry {}", work_item_id, priority, entry.id);
    Ok(())
}

/// Print queue statistics.
pub(crate) async fn stats(config: &Config, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_queue_store(&config.store).await?;
    let stats = store.stats(config.queue.max_retries).await?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&stats)?),
        _ => print_stats(&stats),
    }
    Ok(())
}

fn print_stats(stats: &QueueStats) {
    println!("Queue Statistics");
    println!("================");
    for status in EntryStatus::ALL {
        println!("{:<12} {}", status.as_str(), stats.count(status));
    }
    println!("{:<12} {}", "total", stats.total());
    println!("{:<12} {}", "exhausted", stats.exhausted);
    match stats.avg_processing_ms {
        Some(ms) => println!("{:<12} {:.1} ms", "avg time", ms),
        None => println!("{:<12} -", "avg time"),
    }
    if let Some(oldest) = stats.oldest_pending_queued_at {
        println!("{:<12} {}", "oldest", oldest.to_rfc3339());
    }
}

/// List entries in dequeue order.
pub(crate) async fn list(
    config: &Config,
    status: Option<&str>,
    limit: usize,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let status = status.map(EntryStatus::parse).transpose()?;
    let store = open_queue_store(&config.store).await?;
    let entries = store.list(status, limit).await?;

    if entries.is_empty() {
        println!("No entries found.");
        return Ok(());
    }

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&entries)?),
        _ => print_entries(&entries),
    }
    Ok(())
}

fn print_entries(entries: &[QueueEntry]) {
    println!(
        "{:<36}  {:<20} {:<11} {:<8} {:>5}  {}",
        "ID", "WORK ITEM", "STATUS", "PRIORITY", "TRIES", "ERROR"
    );
    println!("{}", "-".repeat(100));
    for entry in entries {
        println!(
            "{:<36}  {:<20} {:<11} {:<8} {:>5}  {}",
            entry.id,
            entry.work_item_id,
            entry.status.as_str(),
            entry.priority.as_str(),
            entry.retry_count,
            entry.error_message.as_deref().unwrap_or("-"),
        );
    }
}

/// Run one retry pass.
pub(crate) async fn retry(
    config: &Config,
    max_retries: Option<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let max_retries = max_retries.unwrap_or(config.queue.max_retries);
    let store = open_queue_store(&config.store).await?;
    let requeued = RetryCoordinator::new(store, max_retries, Duration::ZERO)
        .tick()
        .await?;

    info!(requeued, max_retries, "Retry pass finished");
    println!("Requeued {} failed entries (max retries {})", requeued, max_retries);
    Ok(())
}

/// Run one cleanup pass.
pub(crate) async fn cleanup(
    config: &Config,
    retention_secs: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let retention = Duration::from_secs(retention_secs.unwrap_or(config.queue.retention_secs));
    let store = open_queue_store(&config.store).await?;
    let removed = CleanupWorker::new(store, retention, Duration::ZERO)
        .tick()
        .await?;

    println!(
        "Removed {} completed entries older than {}s",
        removed,
        retention.as_secs()
    );
    Ok(())
}

/// Run one staleness pass.
pub(crate) async fn reclaim(
    config: &Config,
    stale_after_secs: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let stale_after =
        Duration::from_secs(stale_after_secs.unwrap_or(config.queue.stale_after_secs));
    let store = open_queue_store(&config.store).await?;
    let reclaimed = StalenessMonitor::new(store, stale_after, Duration::ZERO)
        .tick()
        .await?;

    println!(
        "Failed {} entries stuck in processing for more than {}s",
        reclaimed,
        stale_after.as_secs()
    );
    Ok(())
}
