//! Wire types for the analysis endpoint.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fieldscan_protocols::{AnalysisResult, WorkItem};

/// Request body.
#[derive(Debug, Serialize)]
pub struct AnalyzeRequest<'a> {
    pub entry_id: Uuid,
    /// 1-based; the first run of an entry sends 1.
    pub attempt: u32,
    pub work_item: &'a WorkItem,
}

/// Successful response body.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeResponse {
    pub summary: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub confidence: Option<f32>,
    #[serde(default)]
    pub details: serde_json::Value,
}

impl AnalyzeResponse {
    pub fn into_result(self, work_item_id: &str, analyzer: &str) -> AnalysisResult {
        let mut result = AnalysisResult::new(work_item_id, analyzer, self.summary)
            .with_labels(self.labels)
            .with_details(self.details);
        if let Some(confidence) = self.confidence {
            result = result.with_confidence(confidence);
        }
        result
    }
}

/// Extract a readable message from an error body (`{"error": {"message": ..}}`,
/// `{"error": ".."}` or plain text).
pub(crate) fn error_message(body: String) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(&body).ok();
    parsed
        .as_ref()
        .and_then(|v| {
            v["error"]["message"]
                .as_str()
                .or_else(|| v["error"].as_str())
                .map(String::from)
        })
        .unwrap_or(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_defaults() {
        let response: AnalyzeResponse =
            serde_json::from_str(r#"{"summary": "corroded flange"}"#).unwrap();
        assert!(response.labels.is_empty());
        assert!(response.confidence.is_none());
        assert!(response.details.is_null());
    }

    #[test]
    fn test_into_result() {
        let response: AnalyzeResponse = serde_json::from_str(
            r#"{"summary": "leak", "labels": ["water", "valve"], "confidence": 0.8, "details": {"area": "joint"}}"#,
        )
        .unwrap();
        let result = response.into_result("att-1", "http");
        assert_eq!(result.work_item_id, "att-1");
        assert_eq!(result.analyzer, "http");
        assert_eq!(result.labels, vec!["water", "valve"]);
        assert_eq!(result.confidence, Some(0.8));
        assert_eq!(result.details["area"], "joint");
    }

    #[test]
    fn test_error_message_shapes() {
        assert_eq!(
            error_message(r#"{"error": {"message": "bad image"}}"#.to_string()),
            "bad image"
        );
        assert_eq!(error_message(r#"{"error": "quota"}"#.to_string()), "quota");
        assert_eq!(error_message("gateway down".to_string()), "gateway down");
    }
}
