//! Queue entry persistence.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::entry::{EntryPriority, EntryStatus, QueueEntry};
use crate::error::QueueError;
use crate::stats::QueueStats;

/// Durable record of queue entries.
///
/// The store is the only coordination point between workers: `dequeue`
/// must hand a given entry to at most one caller, however many callers race.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Create a `pending` entry with `retry_count = 0`.
    async fn enqueue(
        &self,
        work_item_id: &str,
        priority: EntryPriority,
    ) -> Result<QueueEntry, QueueError>;

    /// Atomically claim the oldest `pending` entry of the highest present
    /// priority tier and flip it to `processing`. `None` when nothing is pending.
    async fn dequeue(&self) -> Result<Option<QueueEntry>, QueueError>;

    /// `processing` -> `completed`, stamping `processed_at`.
    ///
    /// `claimed` is the entry as handed out by `dequeue` (or as listed by
    /// `get_stale_processing_items`). The transition only applies while that
    /// claim is still current: a claim that was reclaimed and handed out again
    /// gets [`QueueError::StaleClaim`].
    async fn mark_completed(&self, claimed: &QueueEntry) -> Result<(), QueueError>;

    /// `processing` -> `failed`, recording the message and bumping `retry_count`.
    /// Fenced to the claim like [`QueueStore::mark_completed`].
    async fn mark_failed(&self, claimed: &QueueEntry, message: &str) -> Result<(), QueueError>;

    /// Requeue every `failed` entry with `retry_count < max_retries`.
    /// Returns the number of entries requeued.
    async fn retry_failed(&self, max_retries: u32) -> Result<u64, QueueError>;

    /// Delete `completed` entries processed more than `older_than` ago.
    /// Returns the number of entries deleted.
    async fn cleanup_completed(&self, older_than: Duration) -> Result<u64, QueueError>;

    /// `processing` entries whose last update is more than `stale_after` ago.
    async fn get_stale_processing_items(
        &self,
        stale_after: Duration,
    ) -> Result<Vec<QueueEntry>, QueueError>;

    async fn get(&self, id: Uuid) -> Result<Option<QueueEntry>, QueueError>;

    /// Entries in dequeue order, optionally filtered by status.
    async fn list(
        &self,
        status: Option<EntryStatus>,
        limit: usize,
    ) -> Result<Vec<QueueEntry>, QueueError>;

    async fn stats(&self, max_retries: u32) -> Result<QueueStats, QueueError>;
}

/// `now - age`, saturating at the earliest representable instant.
pub(crate) fn cutoff(now: DateTime<Utc>, age: Duration) -> Result<DateTime<Utc>, QueueError> {
    let age = chrono::Duration::from_std(age)
        .map_err(|e| QueueError::Mapping(format!("duration out of range: {e}")))?;
    Ok(now.checked_sub_signed(age).unwrap_or(DateTime::<Utc>::MIN_UTC))
}

struct Slot {
    seq: u64,
    entry: QueueEntry,
}

#[derive(Default)]
struct MemoryState {
    next_seq: u64,
    slots: HashMap<Uuid, Slot>,
}

impl MemoryState {
    fn transition(
        &mut self,
        id: Uuid,
        to: EntryStatus,
    ) -> Result<&mut QueueEntry, QueueError> {
        let slot = self.slots.get_mut(&id).ok_or(QueueError::EntryNotFound(id))?;
        let from = slot.entry.status;
        if !from.can_transition_to(to) {
            return Err(QueueError::InvalidTransition { id, from, to });
        }
        Ok(&mut slot.entry)
    }

    /// Like `transition`, but only for the holder of the current claim.
    fn settle(
        &mut self,
        claimed: &QueueEntry,
        to: EntryStatus,
    ) -> Result<&mut QueueEntry, QueueError> {
        let entry = self.transition(claimed.id, to)?;
        if entry.claim_id != claimed.claim_id {
            return Err(QueueError::StaleClaim(claimed.id));
        }
        Ok(entry)
    }

    fn sorted(&self, status: Option<EntryStatus>) -> Vec<&Slot> {
        let mut slots: Vec<&Slot> = self
            .slots
            .values()
            .filter(|s| status.is_none_or(|st| s.entry.status == st))
            .collect();
        slots.sort_by(|a, b| {
            b.entry
                .priority
                .cmp(&a.entry.priority)
                .then(a.entry.created_at.cmp(&b.entry.created_at))
                .then(a.seq.cmp(&b.seq))
        });
        slots
    }
}

/// Single-process queue store. Every operation runs under one async mutex,
/// which makes the claim a plain select-and-flip.
#[derive(Default)]
pub struct MemoryQueueStore {
    state: Mutex<MemoryState>,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn enqueue(
        &self,
        work_item_id: &str,
        priority: EntryPriority,
    ) -> Result<QueueEntry, QueueError> {
        let entry = QueueEntry::new(work_item_id, priority);
        let mut state = self.state.lock().await;
        let seq = state.next_seq;
        state.next_seq += 1;
        state.slots.insert(
            entry.id,
            Slot {
                seq,
                entry: entry.clone(),
            },
        );
        Ok(entry)
    }

    async fn dequeue(&self) -> Result<Option<QueueEntry>, QueueError> {
        let mut state = self.state.lock().await;
        let Some(id) = state
            .sorted(Some(EntryStatus::Pending))
            .first()
            .map(|s| s.entry.id)
        else {
            return Ok(None);
        };
        let entry = state.transition(id, EntryStatus::Processing)?;
        entry.claim(Utc::now());
        Ok(Some(entry.clone()))
    }

    async fn mark_completed(&self, claimed: &QueueEntry) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        state
            .settle(claimed, EntryStatus::Completed)?
            .complete(Utc::now());
        Ok(())
    }

    async fn mark_failed(&self, claimed: &QueueEntry, message: &str) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        state
            .settle(claimed, EntryStatus::Failed)?
            .fail(message, Utc::now());
        Ok(())
    }

    async fn retry_failed(&self, max_retries: u32) -> Result<u64, QueueError> {
        let now = Utc::now();
        let mut state = self.state.lock().await;
        let mut requeued = 0;
        for slot in state.slots.values_mut() {
            if slot.entry.can_retry(max_retries) {
                slot.entry.requeue(now);
                requeued += 1;
            }
        }
        Ok(requeued)
    }

    async fn cleanup_completed(&self, older_than: Duration) -> Result<u64, QueueError> {
        let cutoff = cutoff(Utc::now(), older_than)?;
        let mut state = self.state.lock().await;
        let before = state.slots.len();
        state.slots.retain(|_, slot| {
            !(slot.entry.status == EntryStatus::Completed
                && slot.entry.processed_at.is_some_and(|t| t < cutoff))
        });
        Ok((before - state.slots.len()) as u64)
    }

    async fn get_stale_processing_items(
        &self,
        stale_after: Duration,
    ) -> Result<Vec<QueueEntry>, QueueError> {
        let cutoff = cutoff(Utc::now(), stale_after)?;
        let state = self.state.lock().await;
        let mut stale: Vec<QueueEntry> = state
            .slots
            .values()
            .filter(|s| s.entry.status == EntryStatus::Processing && s.entry.updated_at < cutoff)
            .map(|s| s.entry.clone())
            .collect();
        stale.sort_by_key(|e| e.updated_at);
        Ok(stale)
    }

    async fn get(&self, id: Uuid) -> Result<Option<QueueEntry>, QueueError> {
        let state = self.state.lock().await;
        Ok(state.slots.get(&id).map(|s| s.entry.clone()))
    }

    async fn list(
        &self,
        status: Option<EntryStatus>,
        limit: usize,
    ) -> Result<Vec<QueueEntry>, QueueError> {
        let state = self.state.lock().await;
        Ok(state
            .sorted(status)
            .into_iter()
            .take(limit)
            .map(|s| s.entry.clone())
            .collect())
    }

    async fn stats(&self, max_retries: u32) -> Result<QueueStats, QueueError> {
        let state = self.state.lock().await;
        let mut stats = QueueStats::default();
        let mut total_ms = 0f64;

        for slot in state.slots.values() {
            let entry = &slot.entry;
            stats.add(entry.status, 1);
            match entry.status {
                EntryStatus::Completed => {
                    if let Some(elapsed) = entry.processing_time() {
                        total_ms += elapsed.num_milliseconds() as f64;
                    }
                }
                EntryStatus::Failed if entry.is_exhausted(max_retries) => stats.exhausted += 1,
                EntryStatus::Pending => {
                    stats.oldest_pending_queued_at = Some(match stats.oldest_pending_queued_at {
                        Some(oldest) => oldest.min(entry.queued_at),
                        None => entry.queued_at,
                    });
                }
                _ => {}
            }
        }

        if stats.completed > 0 {
            stats.avg_processing_ms = Some(total_ms / stats.completed as f64);
        }
        Ok(stats)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
