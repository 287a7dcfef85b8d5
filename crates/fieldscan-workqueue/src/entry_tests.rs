use super::*;

#[test]
fn test_priority_order() {
    assert!(EntryPriority::Urgent > EntryPriority::High);
    assert!(EntryPriority::High > EntryPriority::Medium);
    assert!(EntryPriority::Medium > EntryPriority::Low);

    let mut priorities = vec![
        EntryPriority::Medium,
        EntryPriority::Low,
        EntryPriority::Urgent,
        EntryPriority::High,
    ];
    priorities.sort_by(|a, b| b.cmp(a));
    assert_eq!(
        priorities,
        vec![
            EntryPriority::Urgent,
            EntryPriority::High,
            EntryPriority::Medium,
            EntryPriority::Low
        ]
    );
}

#[test]
fn test_priority_rank_round_trip() {
    for priority in EntryPriority::ALL {
        assert_eq!(EntryPriority::from_rank(priority.rank()).unwrap(), priority);
    }
    assert!(matches!(
        EntryPriority::from_rank(9),
        Err(QueueError::Mapping(_))
    ));
}

#[test]
fn test_priority_parse() {
    assert_eq!("urgent".parse::<EntryPriority>().unwrap(), EntryPriority::Urgent);
    assert_eq!(EntryPriority::parse("low").unwrap(), EntryPriority::Low);
    assert!(EntryPriority::parse("URGENT").is_err());
    assert!(EntryPriority::parse("critical").is_err());
}

#[test]
fn test_priority_default_and_serde() {
    assert_eq!(EntryPriority::default(), EntryPriority::Medium);
    assert_eq!(
        serde_json::to_string(&EntryPriority::High).unwrap(),
        "\"high\""
    );
    let parsed: EntryPriority = serde_json::from_str("\"urgent\"").unwrap();
    assert_eq!(parsed, EntryPriority::Urgent);
}

#[test]
fn test_status_parse() {
    for status in EntryStatus::ALL {
        assert_eq!(EntryStatus::parse(status.as_str()).unwrap(), status);
    }
    assert!(matches!(
        EntryStatus::parse("running"),
        Err(QueueError::Mapping(_))
    ));
}

#[test]
fn test_state_machine() {
    use EntryStatus::*;

    assert!(Pending.can_transition_to(Processing));
    assert!(Processing.can_transition_to(Completed));
    assert!(Processing.can_transition_to(Failed));
    assert!(Failed.can_transition_to(Pending));

    assert!(!Pending.can_transition_to(Completed));
    assert!(!Pending.can_transition_to(Failed));
    assert!(!Completed.can_transition_to(Pending));
    assert!(!Completed.can_transition_to(Failed));
    assert!(!Failed.can_transition_to(Completed));
    assert!(!Processing.can_transition_to(Pending));
}

#[test]
fn test_entry_new() {
    let entry = QueueEntry::new("att-1", EntryPriority::High);
    assert_eq!(entry.work_item_id, "att-1");
    assert_eq!(entry.status, EntryStatus::Pending);
    assert_eq!(entry.priority, EntryPriority::High);
    assert_eq!(entry.retry_count, 0);
    assert!(entry.processed_at.is_none());
    assert!(entry.error_message.is_none());
    assert_eq!(entry.created_at, entry.queued_at);
}

#[test]
fn test_entry_fail_and_requeue() {
    let mut entry = QueueEntry::new("att-2", EntryPriority::Low);
    let created = entry.created_at;
    let now = Utc::now();

    entry.claim(now);
    entry.fail("model unavailable", now);
    assert_eq!(entry.status, EntryStatus::Failed);
    assert_eq!(entry.retry_count, 1);
    assert_eq!(entry.processed_at, Some(now));
    assert!(entry.can_retry(3));
    assert!(!entry.is_exhausted(3));

    let later = now + chrono::Duration::seconds(5);
    entry.requeue(later);
    assert_eq!(entry.status, EntryStatus::Pending);
    assert_eq!(entry.retry_count, 1);
    assert!(entry.error_message.is_none());
    assert!(entry.processed_at.is_none());
    assert_eq!(entry.queued_at, later);
    assert_eq!(entry.created_at, created);
    assert!(entry.claim_id.is_none());
}

#[test]
fn test_each_claim_gets_a_fresh_token() {
    let mut entry = QueueEntry::new("att-6", EntryPriority::Medium);
    assert!(entry.claim_id.is_none());
    let now = Utc::now();

    entry.claim(now);
    let first = entry.claim_id;
    assert!(first.is_some());
    entry.fail("boom", now);
    assert_eq!(entry.claim_id, first);

    entry.requeue(now);
    entry.claim(now);
    assert!(entry.claim_id.is_some());
    assert_ne!(entry.claim_id, first);
}

#[test]
fn test_entry_exhausted() {
    let mut entry = QueueEntry::new("att-3", EntryPriority::Medium);
    let now = Utc::now();
    for _ in 0..3 {
        entry.claim(now);
        entry.fail("boom", now);
    }
    assert_eq!(entry.retry_count, 3);
    assert!(!entry.can_retry(3));
    assert!(entry.is_exhausted(3));
}

#[test]
fn test_processing_time() {
    let mut entry = QueueEntry::new("att-4", EntryPriority::Medium);
    assert!(entry.processing_time().is_none());

    let done = entry.queued_at + chrono::Duration::milliseconds(1500);
    entry.claim(done);
    entry.complete(done);
    assert_eq!(
        entry.processing_time(),
        Some(chrono::Duration::milliseconds(1500))
    );
}

#[test]
fn test_entry_serialization() {
    let entry = QueueEntry::new("att-5", EntryPriority::Urgent);
    let json = serde_json::to_value(&entry).unwrap();
    assert_eq!(json["status"], "pending");
    assert_eq!(json["priority"], "urgent");
    assert_eq!(json["work_item_id"], "att-5");
}
