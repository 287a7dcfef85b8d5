//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub queue: QueueSettings,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub analyzer: AnalyzerConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Apply a command-line worker count on top of the file settings, so the
    /// override goes through the same validation.
    pub fn with_worker_override(mut self, workers: Option<u32>) -> Self {
        if let Some(workers) = workers {
            self.queue.workers = workers;
        }
        self
    }
}

/// Queue and worker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSettings {
    /// Number of independent worker loops.
    #[serde(default = "default_workers")]
    pub workers: u32,

    /// Sleep between two polls of one worker.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// A `processing` entry untouched for this long is presumed abandoned.
    #[serde(default = "default_stale_after")]
    pub stale_after_secs: u64,

    /// Staleness monitor tick (0 = half of `stale_after_secs`).
    #[serde(default)]
    pub stale_check_interval_secs: u64,

    /// Retry budget per entry.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_interval")]
    pub retry_interval_secs: u64,

    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,

    /// How long completed entries are kept before cleanup deletes them.
    #[serde(default = "default_retention")]
    pub retention_secs: u64,

    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            poll_interval_secs: default_poll_interval(),
            stale_after_secs: default_stale_after(),
            stale_check_interval_secs: 0,
            max_retries: default_max_retries(),
            retry_interval_secs: default_retry_interval(),
            cleanup_interval_secs: default_cleanup_interval(),
            retention_secs: default_retention(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl QueueSettings {
    /// Effective staleness monitor tick.
    pub fn stale_check_interval(&self) -> Duration {
        if self.stale_check_interval_secs > 0 {
            Duration::from_secs(self.stale_check_interval_secs)
        } else {
            Duration::from_millis(self.stale_after_secs.saturating_mul(1000) / 2)
        }
    }
}

fn default_workers() -> u32 {
    3
}

fn default_poll_interval() -> u64 {
    5
}

fn default_stale_after() -> u64 {
    600
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_interval() -> u64 {
    60
}

fn default_cleanup_interval() -> u64 {
    3600
}

fn default_retention() -> u64 {
    86400
}

fn default_shutdown_timeout() -> u64 {
    30
}

/// Queue store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// `"sqlite"` or `"memory"`.
    #[serde(default = "default_backend")]
    pub backend: String,

    /// SQLite database path (defaults to `~/.fieldscan/queue.db`).
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: None,
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

impl StoreConfig {
    /// Database path, falling back to the data directory.
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| fieldscan_dir().join("queue.db"))
    }
}

fn default_backend() -> String {
    "sqlite".to_string()
}

fn default_busy_timeout() -> u64 {
    5000
}

/// HTTP analyzer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Transport timeout for one analyzer request.
    #[serde(default = "default_analyzer_timeout")]
    pub timeout_secs: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            timeout_secs: default_analyzer_timeout(),
        }
    }
}

fn default_analyzer_timeout() -> u64 {
    120
}

/// Operational HTTP surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_enabled")]
    pub enabled: bool,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: default_server_enabled(),
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_server_enabled() -> bool {
    true
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8090
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,

    /// Directory for rotated log files (console only when unset).
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// Emit JSON lines on the console.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            directory: None,
            json: false,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

/// Data directory (`~/.fieldscan`).
pub fn fieldscan_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".fieldscan"))
        .unwrap_or_else(|| PathBuf::from(".fieldscan"))
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
