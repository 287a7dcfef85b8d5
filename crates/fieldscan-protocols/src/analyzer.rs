//! Analyzer protocol definitions.
//!
//! An analyzer turns one work item (an equipment photo, a scanned form, ...)
//! into an [`AnalysisResult`]. The queue is agnostic to how that happens and
//! only forwards success or failure.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AnalyzerError;
use crate::work_item::WorkItem;

/// Core trait for analysis backends.
///
/// No deadline is imposed on `process`; a call that never returns is
/// recovered by staleness reclamation, not by cancelling the future.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Returns the analyzer ID.
    fn id(&self) -> &str;

    /// Analyze a work item.
    async fn process(
        &self,
        ctx: &AnalysisContext,
        item: &WorkItem,
    ) -> Result<AnalysisResult, AnalyzerError>;
}

/// Per-call context handed to the analyzer.
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    /// Queue entry that carries this work item.
    pub entry_id: Uuid,
    /// Name of the worker running the call.
    pub worker: String,
    /// 1-based number of this attempt: the entry's `retry_count + 1`.
    pub attempt: u32,
}

impl AnalysisContext {
    pub fn new(entry_id: Uuid, worker: impl Into<String>, attempt: u32) -> Self {
        Self {
            entry_id,
            worker: worker.into(),
            attempt,
        }
    }
}

/// Outcome of a successful analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Result ID.
    pub id: Uuid,
    /// Work item the result belongs to.
    pub work_item_id: String,
    /// Analyzer that produced the result.
    pub analyzer: String,
    /// Short human-readable summary.
    pub summary: String,
    /// Detected labels (equipment type, defects, ...).
    #[serde(default)]
    pub labels: Vec<String>,
    /// Overall confidence (0.0 - 1.0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    /// Analyzer-specific payload.
    #[serde(default)]
    pub details: serde_json::Value,
    /// When the analysis finished.
    pub analyzed_at: DateTime<Utc>,
}

impl AnalysisResult {
    pub fn new(
        work_item_id: impl Into<String>,
        analyzer: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            work_item_id: work_item_id.into(),
            analyzer: analyzer.into(),
            summary: summary.into(),
            labels: Vec::new(),
            confidence: None,
            details: serde_json::Value::Null,
            analyzed_at: Utc::now(),
        }
    }

    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }

    /// Set the confidence, clamped to `0.0..=1.0`.
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}
