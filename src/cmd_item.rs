//! Work item subcommand handlers.

use fieldscan_config::Config;
use fieldscan_protocols::{WorkItem, WorkItemRepository};

use crate::cli::ItemAction;
use crate::stores::open_record_store;

/// Handle item subcommands.
pub(crate) async fn handle_item_command(
    config: &Config,
    action: ItemAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ItemAction::Add {
            id,
            path,
            content_type,
            record,
        } => item_add(config, id, path, content_type, record).await,
        ItemAction::Show { id } => item_show(config, &id).await,
    }
}

async fn item_add(
    config: &Config,
    id: String,
    path: String,
    content_type: String,
    record: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut item = WorkItem::new(id, path).with_content_type(content_type);
    if let Some(record) = record {
        item = item.with_record(record);
    }
    if let Ok(meta) = std::fs::metadata(&item.location) {
        item = item.with_size(meta.len());
    }

    let records = open_record_store(&config.store).await?;
    records.insert(&item).await?;
    println!("Registered work item {} ({})", item.id, item.file_name);
    Ok(())
}

async fn item_show(config: &Config, id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let records = open_record_store(&config.store).await?;
    let Some(item) = records.get(id).await? else {
        println!("Work item {} not found.", id);
        return Ok(());
    };

    println!("Work item: {}", item.id);
    println!("{}", "=".repeat(50));
    println!("File:         {}", item.file_name);
    println!("Location:     {}", item.location);
    println!("Content type: {}", item.content_type);
    if let Some(record) = &item.record_id {
        println!("Record:       {}", record);
    }
    println!("Status:       {}", item.status);

    let results = records.results_for(id).await?;
    if results.is_empty() {
        return Ok(());
    }
    println!("\nResults:");
    for result in results {
        let confidence = result
            .confidence
            .map(|c| format!(" ({:.0}%)", c * 100.0))
            .unwrap_or_default();
        println!(
            "  - [{}] {}{}",
            result.analyzed_at.to_rfc3339(),
            result.summary,
            confidence
        );
        if !result.labels.is_empty() {
            println!("    labels: {}", result.labels.join(", "));
        }
    }
    Ok(())
}
