//! Pipeline configuration.

use std::time::Duration;

use fieldscan_config::QueueSettings;

/// Runtime settings for the worker pool and maintenance tasks.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of independent worker loops.
    pub workers: usize,
    /// Sleep before each dequeue attempt.
    pub poll_interval: Duration,
    /// A `processing` entry not updated for this long is reclaimed.
    pub stale_after: Duration,
    /// Staleness monitor tick.
    pub stale_check_interval: Duration,
    /// Retry budget per entry.
    pub max_retries: u32,
    pub retry_interval: Duration,
    pub cleanup_interval: Duration,
    /// Completed entries older than this are deleted.
    pub retention: Duration,
    /// Upper bound on waiting for loops to exit.
    pub shutdown_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_settings(&QueueSettings::default())
    }
}

impl PipelineConfig {
    /// Build from the `[queue]` config section.
    pub fn from_settings(settings: &QueueSettings) -> Self {
        Self {
            workers: settings.workers as usize,
            poll_interval: Duration::from_secs(settings.poll_interval_secs),
            stale_after: Duration::from_secs(settings.stale_after_secs),
            stale_check_interval: settings.stale_check_interval(),
            max_retries: settings.max_retries,
            retry_interval: Duration::from_secs(settings.retry_interval_secs),
            cleanup_interval: Duration::from_secs(settings.cleanup_interval_secs),
            retention: Duration::from_secs(settings.retention_secs),
            shutdown_timeout: Duration::from_secs(settings.shutdown_timeout_secs),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the staleness timeout; the monitor tick becomes half of it.
    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self.stale_check_interval = stale_after / 2;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.workers, 3);
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.stale_after, Duration::from_secs(600));
        assert_eq!(config.stale_check_interval, Duration::from_secs(300));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.cleanup_interval, Duration::from_secs(3600));
        assert_eq!(config.retention, Duration::from_secs(86400));
    }

    #[test]
    fn test_from_settings() {
        let settings = QueueSettings {
            workers: 7,
            stale_after_secs: 60,
            stale_check_interval_secs: 10,
            ..Default::default()
        };
        let config = PipelineConfig::from_settings(&settings);
        assert_eq!(config.workers, 7);
        assert_eq!(config.stale_after, Duration::from_secs(60));
        assert_eq!(config.stale_check_interval, Duration::from_secs(10));
    }

    #[test]
    fn test_builder() {
        let config = PipelineConfig::default()
            .with_workers(1)
            .with_poll_interval(Duration::from_millis(10))
            .with_stale_after(Duration::from_secs(4))
            .with_max_retries(5);
        assert_eq!(config.workers, 1);
        assert_eq!(config.poll_interval, Duration::from_millis(10));
        assert_eq!(config.stale_check_interval, Duration::from_secs(2));
        assert_eq!(config.max_retries, 5);
    }
}
