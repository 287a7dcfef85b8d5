//! # fieldscan Monitor
//!
//! Operational surface for the analysis pipeline.
//!
//! ## Features
//!
//! - Health evaluation of queue statistics (/health)
//! - Prometheus format metrics (/metrics)

pub mod health;
pub mod metrics;

pub use health::{ComponentHealth, HealthEndpoint, HealthResponse, HealthStatus};
pub use metrics::{MetricType, PrometheusText, render_pipeline_metrics};
