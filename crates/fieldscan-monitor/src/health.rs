//! Health check endpoint.

use std::collections::HashMap;
use std::fmt::Display;
use std::time::Duration;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use fieldscan_workqueue::QueueStats;

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status.
    pub status: HealthStatus,
    pub version: String,
    pub uptime_secs: u64,
    /// Component statuses.
    pub components: HashMap<String, ComponentHealth>,
}

/// Health status, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// Working, but something needs an operator.
    Degraded,
    Unhealthy,
}

/// Component health.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ComponentHealth {
    pub fn healthy() -> Self {
        Self {
            status: HealthStatus::Healthy,
            details: None,
        }
    }

    pub fn with_status(status: HealthStatus, details: impl Into<String>) -> Self {
        Self {
            status,
            details: Some(details.into()),
        }
    }
}

/// Health endpoint handler.
pub struct HealthEndpoint {
    version: String,
    start_time: std::time::Instant,
    stale_after: Duration,
}

impl HealthEndpoint {
    /// `stale_after` is the pipeline's staleness timeout; a pending entry
    /// waiting longer than that means workers are not keeping up.
    pub fn new(version: impl Into<String>, stale_after: Duration) -> Self {
        Self {
            version: version.into(),
            start_time: std::time::Instant::now(),
            stale_after,
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Assess the queue from a statistics read.
    pub fn queue_component<E: Display>(
        &self,
        stats: Result<&QueueStats, E>,
        now: DateTime<Utc>,
    ) -> ComponentHealth {
        let stats = match stats {
            Ok(stats) => stats,
            Err(e) => {
                warn!(error = %e, "Queue store unreadable");
                return ComponentHealth::with_status(
                    HealthStatus::Unhealthy,
                    format!("queue store unavailable: {e}"),
                );
            }
        };

        let mut problems = Vec::new();
        if stats.exhausted > 0 {
            problems.push(format!(
                "{} entries exhausted their retry budget",
                stats.exhausted
            ));
        }
        if let Some(age) = stats.oldest_pending_age(now) {
            let waited = age.to_std().unwrap_or_default();
            if waited > self.stale_after {
                problems.push(format!(
                    "oldest pending entry waiting {}s",
                    waited.as_secs()
                ));
            }
        }

        if problems.is_empty() {
            ComponentHealth::healthy()
        } else {
            ComponentHealth::with_status(HealthStatus::Degraded, problems.join("; "))
        }
    }

    /// Generate health response. The overall status is the worst component status.
    pub fn check(&self, components: HashMap<String, ComponentHealth>) -> HealthResponse {
        let status = components
            .values()
            .map(|c| c.status)
            .max()
            .unwrap_or(HealthStatus::Healthy);

        HealthResponse {
            status,
            version: self.version.clone(),
            uptime_secs: self.uptime_secs(),
            components,
        }
    }

    /// Axum response for a health report.
    pub fn respond(&self, components: HashMap<String, ComponentHealth>) -> Response {
        let response = self.check(components);
        let status_code = match response.status {
            HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
            HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        };

        (status_code, Json(response)).into_response()
    }
}
