//! Work item protocol definitions.
//!
//! A work item is the external entity a queue entry tracks, usually a file
//! attached to a service record. The queue only ever holds its id.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::analyzer::AnalysisResult;
use crate::error::RepositoryError;

/// Analysis status of a work item, as seen by its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkItemStatus {
    /// Uploaded, not analyzed yet.
    Uploaded,
    /// Analysis succeeded.
    Processed,
    /// Last analysis attempt failed.
    Failed,
}

impl WorkItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkItemStatus::Uploaded => "uploaded",
            WorkItemStatus::Processed => "processed",
            WorkItemStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "uploaded" => Some(WorkItemStatus::Uploaded),
            "processed" => Some(WorkItemStatus::Processed),
            "failed" => Some(WorkItemStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for WorkItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file waiting for (or having had) analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    /// Work item ID.
    pub id: String,

    /// Service record the file is attached to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,

    /// Original file name.
    pub file_name: String,

    /// MIME type.
    pub content_type: String,

    /// Storage location (path or URL).
    pub location: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,

    pub status: WorkItemStatus,

    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,

    pub created_at: DateTime<Utc>,
}

impl WorkItem {
    pub fn new(id: impl Into<String>, location: impl Into<String>) -> Self {
        let location = location.into();
        let file_name = location
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default()
            .to_string();
        Self {
            id: id.into(),
            record_id: None,
            file_name,
            content_type: "application/octet-stream".to_string(),
            location,
            size_bytes: None,
            status: WorkItemStatus::Uploaded,
            metadata: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_record(mut self, record_id: impl Into<String>) -> Self {
        self.record_id = Some(record_id.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn with_size(mut self, size_bytes: u64) -> Self {
        self.size_bytes = Some(size_bytes);
        self
    }

    /// Whether the file is an image the vision analyzers accept.
    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }
}

/// Lookup and status side-channel toward the work item owner.
#[async_trait]
pub trait WorkItemRepository: Send + Sync {
    /// Fetch a work item by ID.
    async fn get(&self, id: &str) -> Result<Option<WorkItem>, RepositoryError>;

    /// Record the analysis outcome on the work item.
    async fn update_status(&self, id: &str, status: WorkItemStatus) -> Result<(), RepositoryError>;
}

/// Destination for analysis results.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn store(&self, result: &AnalysisResult) -> Result<(), RepositoryError>;
}

#[cfg(test)]
#[path = "work_item_tests.rs"]
mod tests;
