//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Turn the first error into a `ConfigError`.
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(err) => Err(ConfigError::InvalidValue {
                field: err.path,
                message: err.message,
            }),
            None => Ok(self.warnings),
        }
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> Result<ValidationResult, ConfigError> {
        let mut result = ValidationResult::default();

        Self::validate_queue(config, &mut result);
        Self::validate_store(config, &mut result);
        Self::validate_analyzer(config, &mut result);
        Self::validate_server(config, &mut result);
        Self::validate_logging(config, &mut result);

        Ok(result)
    }

    fn validate_queue(config: &Config, result: &mut ValidationResult) {
        let queue = &config.queue;

        if queue.workers == 0 {
            result.add_error(ValidationError::new(
                "queue.workers",
                "Worker count must be greater than 0",
            ));
        }

        if queue.poll_interval_secs == 0 {
            result.add_error(ValidationError::new(
                "queue.poll_interval_secs",
                "Poll interval must be greater than 0",
            ));
        }

        if queue.retry_interval_secs == 0 {
            result.add_error(ValidationError::new(
                "queue.retry_interval_secs",
                "Retry interval must be greater than 0",
            ));
        }

        if queue.cleanup_interval_secs == 0 {
            result.add_error(ValidationError::new(
                "queue.cleanup_interval_secs",
                "Cleanup interval must be greater than 0",
            ));
        }

        if queue.shutdown_timeout_secs == 0 {
            result.add_error(ValidationError::new(
                "queue.shutdown_timeout_secs",
                "Shutdown timeout must be greater than 0",
            ));
        }

        if queue.retention_secs == 0 {
            result.add_error(ValidationError::new(
                "queue.retention_secs",
                "Retention must be greater than 0",
            ));
        }

        if queue.stale_after_secs == 0 {
            result.add_error(ValidationError::new(
                "queue.stale_after_secs",
                "Staleness timeout must be greater than 0",
            ));
            return;
        }

        if queue.stale_check_interval_secs >= queue.stale_after_secs {
            result.add_warning(ValidationWarning::new(
                "queue.stale_check_interval_secs",
                "Stale check interval should be shorter than the staleness timeout",
            ));
        }

        if queue.poll_interval_secs > queue.stale_after_secs {
            result.add_warning(ValidationWarning::new(
                "queue.poll_interval_secs",
                "Poll interval is longer than the staleness timeout",
            ));
        }

        if queue.max_retries == 0 {
            result.add_warning(ValidationWarning::new(
                "queue.max_retries",
                "Failed entries will never be retried",
            ));
        }
    }

    fn validate_store(config: &Config, result: &mut ValidationResult) {
        let valid_backends = ["sqlite", "memory"];
        if !valid_backends.contains(&config.store.backend.as_str()) {
            result.add_error(ValidationError::new(
                "store.backend",
                format!(
                    "Invalid store backend '{}'. Valid options: {:?}",
                    config.store.backend, valid_backends
                ),
            ));
        }
    }

    fn validate_analyzer(config: &Config, result: &mut ValidationResult) {
        if let Some(endpoint) = &config.analyzer.endpoint {
            if endpoint.trim().is_empty() {
                result.add_error(ValidationError::new(
                    "analyzer.endpoint",
                    "Endpoint cannot be empty",
                ));
            }
        }

        if config.analyzer.timeout_secs == 0 {
            result.add_error(ValidationError::new(
                "analyzer.timeout_secs",
                "Timeout must be greater than 0",
            ));
        }
    }

    fn validate_server(config: &Config, result: &mut ValidationResult) {
        if !config.server.enabled {
            return;
        }

        if config.server.port == 0 {
            result.add_error(ValidationError::new(
                "server.port",
                "Port must be greater than 0",
            ));
        }

        if config.server.host.is_empty() {
            result.add_error(ValidationError::new(
                "server.host",
                "Host cannot be empty",
            ));
        }
    }

    fn validate_logging(config: &Config, result: &mut ValidationResult) {
        if config.logging.level.trim().is_empty() {
            result.add_warning(ValidationWarning::new(
                "logging.level",
                "Empty log level, falling back to info",
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
