use super::*;

#[tokio::test]
async fn test_enqueue_creates_pending_entry() {
    let store = MemoryQueueStore::new();
    let entry = store.enqueue("att-1", EntryPriority::High).await.unwrap();

    assert_eq!(entry.status, EntryStatus::Pending);
    assert_eq!(entry.retry_count, 0);
    assert_eq!(store.get(entry.id).await.unwrap(), Some(entry));
}

#[tokio::test]
async fn test_dequeue_empty() {
    let store = MemoryQueueStore::new();
    assert!(store.dequeue().await.unwrap().is_none());
}

#[tokio::test]
async fn test_dequeue_claims_entry() {
    let store = MemoryQueueStore::new();
    let entry = store.enqueue("att-1", EntryPriority::High).await.unwrap();

    let claimed = store.dequeue().await.unwrap().unwrap();
    assert_eq!(claimed.id, entry.id);
    assert_eq!(claimed.work_item_id, "att-1");
    assert_eq!(claimed.status, EntryStatus::Processing);

    // Already claimed, nothing else pending.
    assert!(store.dequeue().await.unwrap().is_none());
}

#[tokio::test]
async fn test_dequeue_priority_then_fifo() {
    let store = MemoryQueueStore::new();
    let low = store.enqueue("low", EntryPriority::Low).await.unwrap();
    let high_a = store.enqueue("high-a", EntryPriority::High).await.unwrap();
    let urgent = store.enqueue("urgent", EntryPriority::Urgent).await.unwrap();
    let high_b = store.enqueue("high-b", EntryPriority::High).await.unwrap();

    let mut order = Vec::new();
    while let Some(entry) = store.dequeue().await.unwrap() {
        order.push(entry.id);
    }
    assert_eq!(order, vec![urgent.id, high_a.id, high_b.id, low.id]);
}

#[tokio::test]
async fn test_mark_completed() {
    let store = MemoryQueueStore::new();
    store.enqueue("att-1", EntryPriority::Medium).await.unwrap();
    let claimed = store.dequeue().await.unwrap().unwrap();

    store.mark_completed(&claimed).await.unwrap();

    let entry = store.get(claimed.id).await.unwrap().unwrap();
    assert_eq!(entry.status, EntryStatus::Completed);
    assert!(entry.processed_at.is_some());
}

#[tokio::test]
async fn test_mark_failed_increments_retry_count() {
    let store = MemoryQueueStore::new();
    store.enqueue("att-1", EntryPriority::Medium).await.unwrap();
    let claimed = store.dequeue().await.unwrap().unwrap();

    store.mark_failed(&claimed, "vision timeout").await.unwrap();

    let entry = store.get(claimed.id).await.unwrap().unwrap();
    assert_eq!(entry.status, EntryStatus::Failed);
    assert_eq!(entry.retry_count, 1);
    assert_eq!(entry.error_message.as_deref(), Some("vision timeout"));
    assert!(entry.processed_at.is_some());
}

#[tokio::test]
async fn test_mark_completed_requires_processing() {
    let store = MemoryQueueStore::new();
    let entry = store.enqueue("att-1", EntryPriority::Medium).await.unwrap();

    let err = store.mark_completed(&entry).await.unwrap_err();
    assert!(matches!(
        err,
        QueueError::InvalidTransition {
            from: EntryStatus::Pending,
            to: EntryStatus::Completed,
            ..
        }
    ));
}

#[tokio::test]
async fn test_mark_failed_on_completed_entry() {
    let store = MemoryQueueStore::new();
    store.enqueue("att-1", EntryPriority::Medium).await.unwrap();
    let claimed = store.dequeue().await.unwrap().unwrap();
    store.mark_completed(&claimed).await.unwrap();

    let err = store.mark_failed(&claimed, "late").await.unwrap_err();
    assert!(matches!(err, QueueError::InvalidTransition { .. }));

    let entry = store.get(claimed.id).await.unwrap().unwrap();
    assert_eq!(entry.status, EntryStatus::Completed);
    assert_eq!(entry.retry_count, 0);
}

#[tokio::test]
async fn test_mark_unknown_entry() {
    let store = MemoryQueueStore::new();
    let ghost = QueueEntry::new("ghost", EntryPriority::Medium);
    assert!(matches!(
        store.mark_completed(&ghost).await,
        Err(QueueError::EntryNotFound(missing)) if missing == ghost.id
    ));
    assert!(matches!(
        store.mark_failed(&ghost, "x").await,
        Err(QueueError::EntryNotFound(_))
    ));
}

#[tokio::test]
async fn test_late_outcome_from_reclaimed_claim_is_rejected() {
    let store = MemoryQueueStore::new();
    store.enqueue("att-1", EntryPriority::Medium).await.unwrap();

    // First claim is reclaimed as stale, retried and claimed again.
    let first = store.dequeue().await.unwrap().unwrap();
    store.mark_failed(&first, "processing timed out").await.unwrap();
    assert_eq!(store.retry_failed(3).await.unwrap(), 1);
    let second = store.dequeue().await.unwrap().unwrap();
    assert_eq!(second.id, first.id);
    assert_ne!(second.claim_id, first.claim_id);

    // The original holder finishes late.
    assert!(matches!(
        store.mark_completed(&first).await,
        Err(QueueError::StaleClaim(id)) if id == first.id
    ));
    assert!(matches!(
        store.mark_failed(&first, "late").await,
        Err(QueueError::StaleClaim(_))
    ));
    let entry = store.get(first.id).await.unwrap().unwrap();
    assert_eq!(entry.status, EntryStatus::Processing);
    assert_eq!(entry.claim_id, second.claim_id);

    store.mark_completed(&second).await.unwrap();
    let entry = store.get(first.id).await.unwrap().unwrap();
    assert_eq!(entry.status, EntryStatus::Completed);
    assert_eq!(entry.retry_count, 1);
}

#[tokio::test]
async fn test_retry_failed_requeues_under_budget() {
    let store = MemoryQueueStore::new();
    store.enqueue("att-1", EntryPriority::Medium).await.unwrap();
    let claimed = store.dequeue().await.unwrap().unwrap();
    store.mark_failed(&claimed, "boom").await.unwrap();

    assert_eq!(store.retry_failed(3).await.unwrap(), 1);

    let entry = store.get(claimed.id).await.unwrap().unwrap();
    assert_eq!(entry.status, EntryStatus::Pending);
    assert_eq!(entry.retry_count, 1);
    assert!(entry.error_message.is_none());
    assert!(entry.processed_at.is_none());
}

#[tokio::test]
async fn test_retry_failed_respects_budget() {
    let store = MemoryQueueStore::new();
    store.enqueue("att-1", EntryPriority::Medium).await.unwrap();
    let claimed = store.dequeue().await.unwrap().unwrap();
    store.mark_failed(&claimed, "boom").await.unwrap();

    assert_eq!(store.retry_failed(1).await.unwrap(), 0);
    let entry = store.get(claimed.id).await.unwrap().unwrap();
    assert_eq!(entry.status, EntryStatus::Failed);
}

#[tokio::test]
async fn test_retried_entry_keeps_fifo_position() {
    let store = MemoryQueueStore::new();
    let first = store.enqueue("first", EntryPriority::Medium).await.unwrap();
    let claimed = store.dequeue().await.unwrap().unwrap();
    assert_eq!(claimed.id, first.id);
    let second = store.enqueue("second", EntryPriority::Medium).await.unwrap();

    store.mark_failed(&claimed, "boom").await.unwrap();
    store.retry_failed(3).await.unwrap();

    assert_eq!(store.dequeue().await.unwrap().unwrap().id, first.id);
    assert_eq!(store.dequeue().await.unwrap().unwrap().id, second.id);
}

#[tokio::test]
async fn test_cleanup_completed() {
    let store = MemoryQueueStore::new();
    store.enqueue("done", EntryPriority::Medium).await.unwrap();
    let claimed = store.dequeue().await.unwrap().unwrap();
    store.mark_completed(&claimed).await.unwrap();
    let pending = store.enqueue("pending", EntryPriority::Medium).await.unwrap();

    // Retention window not yet passed.
    assert_eq!(
        store.cleanup_completed(Duration::from_secs(3600)).await.unwrap(),
        0
    );

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(
        store.cleanup_completed(Duration::from_millis(5)).await.unwrap(),
        1
    );
    assert!(store.get(claimed.id).await.unwrap().is_none());
    assert!(store.get(pending.id).await.unwrap().is_some());

    assert_eq!(
        store.cleanup_completed(Duration::from_millis(5)).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn test_stale_processing_items() {
    let store = MemoryQueueStore::new();
    store.enqueue("att-1", EntryPriority::Medium).await.unwrap();
    let claimed = store.dequeue().await.unwrap().unwrap();
    store.enqueue("att-2", EntryPriority::Medium).await.unwrap();

    assert!(
        store
            .get_stale_processing_items(Duration::from_secs(600))
            .await
            .unwrap()
            .is_empty()
    );

    tokio::time::sleep(Duration::from_millis(20)).await;
    let stale = store
        .get_stale_processing_items(Duration::from_millis(5))
        .await
        .unwrap();
    assert_eq!(stale.len(), 1);
    assert_eq!(stale[0].id, claimed.id);
}

#[tokio::test]
async fn test_list_filters_and_orders() {
    let store = MemoryQueueStore::new();
    let low = store.enqueue("low", EntryPriority::Low).await.unwrap();
    let urgent = store.enqueue("urgent", EntryPriority::Urgent).await.unwrap();
    let medium = store.enqueue("medium", EntryPriority::Medium).await.unwrap();

    let all = store.list(None, 10).await.unwrap();
    let ids: Vec<Uuid> = all.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![urgent.id, medium.id, low.id]);

    assert_eq!(store.list(None, 2).await.unwrap().len(), 2);

    store.dequeue().await.unwrap();
    let processing = store.list(Some(EntryStatus::Processing), 10).await.unwrap();
    assert_eq!(processing.len(), 1);
    assert_eq!(processing[0].id, urgent.id);
}

#[tokio::test]
async fn test_stats() {
    let store = MemoryQueueStore::new();
    for id in ["a", "b", "c", "d"] {
        store.enqueue(id, EntryPriority::Medium).await.unwrap();
    }
    let done = store.dequeue().await.unwrap().unwrap();
    store.mark_completed(&done).await.unwrap();
    let failed = store.dequeue().await.unwrap().unwrap();
    store.mark_failed(&failed, "boom").await.unwrap();
    store.dequeue().await.unwrap().unwrap();

    let stats = store.stats(1).await.unwrap();
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.processing, 1);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.exhausted, 1);
    assert!(stats.avg_processing_ms.is_some());
    assert!(stats.oldest_pending_queued_at.is_some());

    let stats = store.stats(3).await.unwrap();
    assert_eq!(stats.exhausted, 0);
}

#[tokio::test]
async fn test_stats_empty() {
    let store = MemoryQueueStore::new();
    let stats = store.stats(3).await.unwrap();
    assert_eq!(stats, QueueStats::default());
}

#[test]
fn test_cutoff_saturates() {
    let now = Utc::now();
    assert_eq!(cutoff(now, Duration::ZERO).unwrap(), now);
    assert!(cutoff(now, Duration::from_secs(u64::MAX)).is_err());
    assert!(cutoff(now, Duration::from_secs(60)).unwrap() < now);
}
