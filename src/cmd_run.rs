//! `fieldscan run`: the long-running pipeline process.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use fieldscan_analyzer_http::HttpAnalyzer;
use fieldscan_config::Config;
use fieldscan_workqueue::{Pipeline, PipelineConfig, WorkerContext};

use crate::server::{ServerState, serve};
use crate::stores::{open_queue_store, open_record_store};

/// Run the pipeline in foreground until SIGINT / SIGTERM.
pub(crate) async fn run_pipeline(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting fieldscan v{}", env!("CARGO_PKG_VERSION"));

    let store = open_queue_store(&config.store).await?;
    let records = Arc::new(open_record_store(&config.store).await?);
    let analyzer = HttpAnalyzer::from_config(&config.analyzer)?;
    info!(endpoint = %analyzer.endpoint(), "HTTP analyzer configured");

    let pipeline_config = PipelineConfig::from_settings(&config.queue);

    let ctx = WorkerContext {
        store,
        items: records.clone(),
        analyzer: Arc::new(analyzer),
        results: records,
    };
    let pipeline = Arc::new(Pipeline::new(pipeline_config, ctx));
    pipeline.start().await?;

    let server_token = CancellationToken::new();
    let server = if config.server.enabled {
        let state = ServerState::new(pipeline.clone());
        let server_config = config.server.clone();
        let token = server_token.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = serve(&server_config, state, token).await {
                error!(error = %e, "Stats server failed");
            }
        }))
    } else {
        info!("Stats server disabled");
        None
    };

    shutdown_signal().await;

    server_token.cancel();
    if let Some(handle) = server {
        if let Err(e) = handle.await {
            error!(error = %e, "Stats server task panicked");
        }
    }

    pipeline.shutdown().await?;
    info!("fieldscan stopped");
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            warn!(error = %e, "Failed to install SIGTERM handler, waiting for Ctrl+C only");
            wait_ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = wait_ctrl_c() => {}
        _ = sigterm.recv() => info!("Received SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    wait_ctrl_c().await;
}

async fn wait_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C"),
        Err(e) => {
            // Without a signal source the process can only be killed; keep running.
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}
