use super::*;
use tempfile::TempDir;

async fn create_test_store() -> SqliteRecordStore {
    SqliteRecordStore::in_memory().await.unwrap()
}

fn photo(id: &str) -> WorkItem {
    let mut item = WorkItem::new(id, format!("/uploads/rec-1/{id}.jpg"))
        .with_record("rec-1")
        .with_content_type("image/jpeg")
        .with_size(48_213);
    item.metadata
        .insert("site".to_string(), serde_json::json!("north-plant"));
    item
}

#[tokio::test]
async fn test_insert_and_get() {
    let store = create_test_store().await;
    let item = photo("att-1");
    store.insert(&item).await.unwrap();

    let loaded = store.get("att-1").await.unwrap().unwrap();
    assert_eq!(loaded.id, "att-1");
    assert_eq!(loaded.record_id.as_deref(), Some("rec-1"));
    assert_eq!(loaded.file_name, "att-1.jpg");
    assert_eq!(loaded.content_type, "image/jpeg");
    assert_eq!(loaded.size_bytes, Some(48_213));
    assert_eq!(loaded.status, WorkItemStatus::Uploaded);
    assert_eq!(loaded.metadata["site"], "north-plant");
    assert_eq!(
        loaded.created_at.timestamp_millis(),
        item.created_at.timestamp_millis()
    );
}

#[tokio::test]
async fn test_get_missing() {
    let store = create_test_store().await;
    assert!(store.get("nope").await.unwrap().is_none());
}

#[tokio::test]
async fn test_insert_duplicate_fails() {
    let store = create_test_store().await;
    store.insert(&photo("att-1")).await.unwrap();
    assert!(matches!(
        store.insert(&photo("att-1")).await,
        Err(RepositoryError::Database(_))
    ));
}

#[tokio::test]
async fn test_update_status() {
    let store = create_test_store().await;
    store.insert(&photo("att-1")).await.unwrap();

    store
        .update_status("att-1", WorkItemStatus::Processed)
        .await
        .unwrap();
    let loaded = store.get("att-1").await.unwrap().unwrap();
    assert_eq!(loaded.status, WorkItemStatus::Processed);

    assert!(matches!(
        store.update_status("missing", WorkItemStatus::Failed).await,
        Err(RepositoryError::NotFound(id)) if id == "missing"
    ));
}

#[tokio::test]
async fn test_store_results_newest_first() {
    let store = create_test_store().await;
    store.insert(&photo("att-1")).await.unwrap();

    let mut first = AnalysisResult::new("att-1", "http", "blurry, retake")
        .with_labels(vec!["unreadable".to_string()]);
    first.analyzed_at = Utc::now() - chrono::Duration::seconds(30);
    let second = AnalysisResult::new("att-1", "http", "Gate valve, corrosion on stem")
        .with_labels(vec!["valve".to_string(), "corrosion".to_string()])
        .with_confidence(0.75)
        .with_details(serde_json::json!({"severity": "low"}));

    store.store(&first).await.unwrap();
    store.store(&second).await.unwrap();

    let results = store.results_for("att-1").await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id, second.id);
    assert_eq!(results[0].labels, vec!["valve", "corrosion"]);
    assert_eq!(results[0].confidence, Some(0.75));
    assert_eq!(results[0].details["severity"], "low");
    assert_eq!(results[1].id, first.id);
    assert!(results[1].confidence.is_none());

    assert!(store.results_for("att-2").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_records_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("records.db");

    {
        let store = SqliteRecordStore::open(&path).await.unwrap();
        store.insert(&photo("att-1")).await.unwrap();
    }

    let store = SqliteRecordStore::open(&path).await.unwrap();
    assert!(store.get("att-1").await.unwrap().is_some());
}
