use super::*;

#[test]
fn test_work_item_new() {
    let item = WorkItem::new("att-1", "/srv/uploads/rec-7/pump.jpg");
    assert_eq!(item.id, "att-1");
    assert_eq!(item.file_name, "pump.jpg");
    assert_eq!(item.status, WorkItemStatus::Uploaded);
    assert!(item.record_id.is_none());
}

#[test]
fn test_work_item_builders() {
    let item = WorkItem::new("att-2", "s3://bucket/boiler.png")
        .with_record("rec-11")
        .with_content_type("image/png")
        .with_size(2048);
    assert_eq!(item.record_id.as_deref(), Some("rec-11"));
    assert_eq!(item.file_name, "boiler.png");
    assert_eq!(item.size_bytes, Some(2048));
    assert!(item.is_image());
}

#[test]
fn test_work_item_not_image() {
    let item = WorkItem::new("att-3", "invoice.pdf").with_content_type("application/pdf");
    assert!(!item.is_image());
}

#[test]
fn test_status_strings() {
    for status in [
        WorkItemStatus::Uploaded,
        WorkItemStatus::Processed,
        WorkItemStatus::Failed,
    ] {
        assert_eq!(WorkItemStatus::parse(status.as_str()), Some(status));
    }
    assert_eq!(WorkItemStatus::parse("archived"), None);
}

#[test]
fn test_status_serialization() {
    let json = serde_json::to_string(&WorkItemStatus::Processed).unwrap();
    assert_eq!(json, "\"processed\"");
}

#[test]
fn test_work_item_deserialization() {
    let json = r#"{
        "id": "att-5",
        "file_name": "valve.jpg",
        "content_type": "image/jpeg",
        "location": "/tmp/valve.jpg",
        "status": "uploaded",
        "created_at": "2024-05-01T10:00:00Z"
    }"#;
    let item: WorkItem = serde_json::from_str(json).unwrap();
    assert_eq!(item.id, "att-5");
    assert!(item.metadata.is_empty());
    assert!(item.is_image());
}
