//! Operational HTTP surface: health, stats, metrics and the enqueue endpoint.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use fieldscan_config::ServerConfig;
use fieldscan_monitor::{HealthEndpoint, render_pipeline_metrics};
use fieldscan_workqueue::{EntryPriority, Pipeline, PoolStats, QueueStats};

/// Shared handler state.
#[derive(Clone)]
pub(crate) struct ServerState {
    pub pipeline: Arc<Pipeline>,
    pub health: Arc<HealthEndpoint>,
}

impl ServerState {
    pub(crate) fn new(pipeline: Arc<Pipeline>) -> Self {
        let health = HealthEndpoint::new(env!("CARGO_PKG_VERSION"), pipeline.config().stale_after);
        Self {
            pipeline,
            health: Arc::new(health),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct EnqueueRequest {
    pub work_item_id: String,
    #[serde(default)]
    pub priority: EntryPriority,
}

#[derive(Debug, Serialize)]
pub(crate) struct StatsResponse {
    pub queue: QueueStats,
    pub pool: PoolStats,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

pub(crate) fn router(state: ServerState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/metrics", get(metrics))
        .route("/entries", post(create_entry))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health
async fn health(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = state.pipeline.stats().await;
    let mut components = HashMap::new();
    components.insert(
        "queue".to_string(),
        state.health.queue_component(stats.as_ref(), Utc::now()),
    );
    state.health.respond(components)
}

/// GET /stats
async fn stats(State(state): State<ServerState>) -> Response {
    match state.pipeline.stats().await {
        Ok(queue) => Json(StatsResponse {
            queue,
            pool: state.pipeline.pool_stats(),
        })
        .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to read queue stats");
            error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
    }
}

/// GET /metrics
async fn metrics(State(state): State<ServerState>) -> Response {
    match state.pipeline.stats().await {
        Ok(queue) => render_pipeline_metrics(&queue, &state.pipeline.pool_stats())
            .response()
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to read queue stats");
            error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
    }
}

/// POST /entries
async fn create_entry(
    State(state): State<ServerState>,
    Json(req): Json<EnqueueRequest>,
) -> Response {
    let work_item_id = req.work_item_id.trim();
    if work_item_id.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "work_item_id must not be empty");
    }

    match state.pipeline.enqueue(work_item_id, req.priority).await {
        Ok(entry) => (StatusCode::CREATED, Json(entry)).into_response(),
        Err(e) => {
            error!(work_item_id, error = %e, "Failed to enqueue work item");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// Bind and serve until `token` is cancelled.
pub(crate) async fn serve(
    config: &ServerConfig,
    state: ServerState,
    token: CancellationToken,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr: std::net::SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Stats server listening on http://{}", addr);
    info!("  GET  /health   - health check");
    info!("  GET  /stats    - queue and pool statistics");
    info!("  GET  /metrics  - Prometheus metrics");
    info!("  POST /entries  - queue a work item");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(token.cancelled_owned())
        .await?;
    info!("Stats server stopped");
    Ok(())
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
