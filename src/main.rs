//! fieldscan - asynchronous analysis pipeline for service-record attachments
//!
//! Main entry point for the fieldscan CLI and pipeline process.

mod cli;
mod cmd_item;
mod cmd_queue;
mod cmd_run;
mod server;
mod stores;

use clap::Parser;
use tracing::warn;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use fieldscan_config::{ConfigLoader, ConfigValidator, LoggingConfig};

use crate::cli::{Cli, Commands};

/// Initialize tracing with console and optional file output.
///
/// `RUST_LOG` wins over `logging.level`. Log files rotate daily.
fn init_tracing(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let file_layer = match &config.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("fieldscan")
                .filename_suffix("log")
                .max_log_files(30)
                .build(dir)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            // Keep the writer alive for the whole process
            static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
                std::sync::OnceLock::new();
            let _ = GUARD.set(guard);

            Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
        }
        None => None,
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let json_layer = config.json.then(|| fmt::layer().json().with_target(true));
    let text_layer = (!config.json).then(|| fmt::layer().with_target(true).with_ansi(true));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(file_layer)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let command = cli.command.unwrap_or(Commands::Run { workers: None });
    let workers = match &command {
        Commands::Run { workers } => *workers,
        _ => None,
    };
    let config = ConfigLoader::load_or_default(&cli.config)?.with_worker_override(workers);
    init_tracing(&config.logging)?;

    for warning in ConfigValidator::validate(&config)?.into_result()? {
        warn!(field = %warning.path, "{}", warning.message);
    }

    match command {
        Commands::Run { .. } => cmd_run::run_pipeline(config).await,
        Commands::Enqueue {
            work_item_id,
            priority,
        } => cmd_queue::enqueue(&config, &work_item_id, &priority).await,
        Commands::Stats { format } => cmd_queue::stats(&config, &format).await,
        Commands::List {
            status,
            limit,
            format,
        } => cmd_queue::list(&config, status.as_deref(), limit, &format).await,
        Commands::Retry { max_retries } => cmd_queue::retry(&config, max_retries).await,
        Commands::Cleanup { retention_secs } => cmd_queue::cleanup(&config, retention_secs).await,
        Commands::Reclaim { stale_after_secs } => {
            cmd_queue::reclaim(&config, stale_after_secs).await
        }
        Commands::Item { action } => cmd_item::handle_item_command(&config, action).await,
    }
}
