//! Queue entry definition and state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::QueueError;

/// Entry priority. Variants are declared in rank order, so the derived
/// `Ord` is the dequeue order (`Urgent` highest).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum EntryPriority {
    Low = 0,
    #[default]
    Medium = 1,
    High = 2,
    Urgent = 3,
}

impl EntryPriority {
    pub const ALL: [EntryPriority; 4] = [
        EntryPriority::Low,
        EntryPriority::Medium,
        EntryPriority::High,
        EntryPriority::Urgent,
    ];

    /// Numeric rank stored alongside the entry; higher is served first.
    pub fn rank(self) -> i64 {
        self as i64
    }

    pub fn from_rank(rank: i64) -> Result<Self, QueueError> {
        Self::ALL
            .into_iter()
            .find(|p| p.rank() == rank)
            .ok_or_else(|| QueueError::Mapping(format!("unknown priority rank {rank}")))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntryPriority::Low => "low",
            EntryPriority::Medium => "medium",
            EntryPriority::High => "high",
            EntryPriority::Urgent => "urgent",
        }
    }

    pub fn parse(value: &str) -> Result<Self, QueueError> {
        match value {
            "low" => Ok(EntryPriority::Low),
            "medium" => Ok(EntryPriority::Medium),
            "high" => Ok(EntryPriority::High),
            "urgent" => Ok(EntryPriority::Urgent),
            other => Err(QueueError::Mapping(format!("unknown priority '{other}'"))),
        }
    }
}

impl std::fmt::Display for EntryPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntryPriority {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Entry status.
///
/// ```text
/// pending --dequeue--> processing --success--> completed
///                      processing --failure/stale--> failed
/// failed --retry (retry_count < max)--> pending
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// Waiting to be claimed.
    Pending,
    /// Claimed by a worker.
    Processing,
    /// Analysis succeeded.
    Completed,
    /// Analysis failed or the claim went stale.
    Failed,
}

impl EntryStatus {
    pub const ALL: [EntryStatus; 4] = [
        EntryStatus::Pending,
        EntryStatus::Processing,
        EntryStatus::Completed,
        EntryStatus::Failed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntryStatus::Pending => "pending",
            EntryStatus::Processing => "processing",
            EntryStatus::Completed => "completed",
            EntryStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Result<Self, QueueError> {
        match value {
            "pending" => Ok(EntryStatus::Pending),
            "processing" => Ok(EntryStatus::Processing),
            "completed" => Ok(EntryStatus::Completed),
            "failed" => Ok(EntryStatus::Failed),
            other => Err(QueueError::Mapping(format!("unknown status '{other}'"))),
        }
    }

    /// Whether the state machine allows moving from `self` to `to`.
    pub fn can_transition_to(self, to: EntryStatus) -> bool {
        matches!(
            (self, to),
            (EntryStatus::Pending, EntryStatus::Processing)
                | (EntryStatus::Processing, EntryStatus::Completed)
                | (EntryStatus::Processing, EntryStatus::Failed)
                | (EntryStatus::Failed, EntryStatus::Pending)
        )
    }
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntryStatus {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A unit of scheduled work. References its work item by ID only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Unique entry ID.
    pub id: Uuid,
    /// ID of the work item to analyze.
    pub work_item_id: String,
    pub status: EntryStatus,
    pub priority: EntryPriority,
    /// When the entry last became `pending`.
    pub queued_at: DateTime<Utc>,
    /// Set when the entry reaches `completed` or `failed`.
    pub processed_at: Option<DateTime<Utc>>,
    /// Creation time; FIFO key within a priority tier.
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Number of recorded failures. Never decreases.
    pub retry_count: u32,
    pub error_message: Option<String>,
    /// Token of the claim that moved the entry to `processing`. Only the
    /// holder of this claim may record its outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_id: Option<Uuid>,
}

impl QueueEntry {
    /// Create a new `pending` entry.
    pub fn new(work_item_id: impl Into<String>, priority: EntryPriority) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            work_item_id: work_item_id.into(),
            status: EntryStatus::Pending,
            priority,
            queued_at: now,
            processed_at: None,
            created_at: now,
            updated_at: now,
            retry_count: 0,
            error_message: None,
            claim_id: None,
        }
    }

    /// Whether the retry coordinator may still requeue this entry.
    pub fn can_retry(&self, max_retries: u32) -> bool {
        self.status == EntryStatus::Failed && self.retry_count < max_retries
    }

    /// A failed entry that has used up its retry budget.
    pub fn is_exhausted(&self, max_retries: u32) -> bool {
        self.status == EntryStatus::Failed && self.retry_count >= max_retries
    }

    /// Time from the last enqueue to completion or failure.
    pub fn processing_time(&self) -> Option<chrono::Duration> {
        self.processed_at.map(|done| done - self.queued_at)
    }

    /// Apply the claim transition in place.
    pub(crate) fn claim(&mut self, now: DateTime<Utc>) {
        self.status = EntryStatus::Processing;
        self.claim_id = Some(Uuid::new_v4());
        self.updated_at = now;
    }

    pub(crate) fn complete(&mut self, now: DateTime<Utc>) {
        self.status = EntryStatus::Completed;
        self.processed_at = Some(now);
        self.updated_at = now;
    }

    pub(crate) fn fail(&mut self, message: &str, now: DateTime<Utc>) {
        self.status = EntryStatus::Failed;
        self.error_message = Some(message.to_string());
        self.retry_count += 1;
        self.processed_at = Some(now);
        self.updated_at = now;
    }

    pub(crate) fn requeue(&mut self, now: DateTime<Utc>) {
        self.status = EntryStatus::Pending;
        self.error_message = None;
        self.processed_at = None;
        self.claim_id = None;
        self.queued_at = now;
        self.updated_at = now;
    }
}

#[cfg(test)]
#[path = "entry_tests.rs"]
mod tests;
