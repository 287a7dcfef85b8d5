//! Queue statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entry::EntryStatus;

/// Snapshot of the queue, as exposed to health and metrics collaborators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
    /// Mean of `processed_at - queued_at` over completed entries.
    pub avg_processing_ms: Option<f64>,
    /// Failed entries whose retry budget is used up.
    pub exhausted: u64,
    /// Enqueue time of the longest-waiting pending entry.
    pub oldest_pending_queued_at: Option<DateTime<Utc>>,
}

impl QueueStats {
    pub fn total(&self) -> u64 {
        self.pending + self.processing + self.completed + self.failed
    }

    pub fn count(&self, status: EntryStatus) -> u64 {
        match status {
            EntryStatus::Pending => self.pending,
            EntryStatus::Processing => self.processing,
            EntryStatus::Completed => self.completed,
            EntryStatus::Failed => self.failed,
        }
    }

    pub(crate) fn add(&mut self, status: EntryStatus, n: u64) {
        match status {
            EntryStatus::Pending => self.pending += n,
            EntryStatus::Processing => self.processing += n,
            EntryStatus::Completed => self.completed += n,
            EntryStatus::Failed => self.failed += n,
        }
    }

    /// How long the oldest pending entry has been waiting.
    pub fn oldest_pending_age(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.oldest_pending_queued_at.map(|queued| now - queued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_and_count() {
        let mut stats = QueueStats::default();
        stats.add(EntryStatus::Pending, 2);
        stats.add(EntryStatus::Failed, 1);
        stats.add(EntryStatus::Pending, 1);
        assert_eq!(stats.total(), 4);
        assert_eq!(stats.count(EntryStatus::Pending), 3);
        assert_eq!(stats.count(EntryStatus::Completed), 0);
    }

    #[test]
    fn test_oldest_pending_age() {
        let now = Utc::now();
        let stats = QueueStats {
            oldest_pending_queued_at: Some(now - chrono::Duration::seconds(90)),
            ..Default::default()
        };
        assert_eq!(
            stats.oldest_pending_age(now),
            Some(chrono::Duration::seconds(90))
        );
        assert!(QueueStats::default().oldest_pending_age(now).is_none());
    }
}
