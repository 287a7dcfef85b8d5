//! HTTP vision analyzer for fieldscan.
//!
//! Sends each work item to a remote analysis endpoint and maps the reply
//! into an [`AnalysisResult`](fieldscan_protocols::AnalysisResult).

mod analyzer;
mod api;

pub use analyzer::HttpAnalyzer;
pub use api::{AnalyzeRequest, AnalyzeResponse};
