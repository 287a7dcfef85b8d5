//! Collaborator errors.

use thiserror::Error;

/// Errors returned by an [`Analyzer`](crate::Analyzer).
///
/// The queue records every variant the same way; the distinction only
/// shows up in the stored error message.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Analyzer unavailable: {0}")]
    Unavailable(String),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Analysis failed: {0}")]
    Failed(String),
}

/// Errors returned by work item repositories and result sinks.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Work item not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyzer_error_api() {
        let err = AnalyzerError::Api {
            status: 503,
            message: "model loading".to_string(),
        };
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("model loading"));
    }

    #[test]
    fn test_analyzer_error_timeout() {
        let err = AnalyzerError::Timeout(120);
        assert_eq!(err.to_string(), "Timeout after 120 seconds");
    }

    #[test]
    fn test_repository_error_not_found() {
        let err = RepositoryError::NotFound("att-42".to_string());
        assert!(err.to_string().contains("att-42"));
    }
}
