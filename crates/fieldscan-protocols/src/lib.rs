//! # fieldscan Protocols
//!
//! Contracts between the analysis queue and the systems around it.
//! Contains only interface definitions - no implementations.
//!
//! ## Core Traits
//!
//! - [`Analyzer`] - performs the analysis of a single work item
//! - [`WorkItemRepository`] - looks up work items and receives status updates
//! - [`ResultSink`] - persists analysis results

pub mod analyzer;
pub mod error;
pub mod work_item;

pub use analyzer::{AnalysisContext, AnalysisResult, Analyzer};
pub use error::{AnalyzerError, RepositoryError};
pub use work_item::{ResultSink, WorkItem, WorkItemRepository, WorkItemStatus};
