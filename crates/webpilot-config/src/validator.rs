//! Configuration validation.

use crate::schema::{Config, DRIVER_KINDS};

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
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_server(config, &mut result);
        Self::validate_engine(config, &mut result);
        Self::validate_recovery(config, &mut result);
        Self::validate_llm(config, &mut result);
        Self::validate_driver(config, &mut result);

        result
    }

    fn validate_server(config: &Config, result: &mut ValidationResult) {
        if config.server.port == 0 {
            result.add_error(ValidationError::new("server.port", "Port cannot be 0"));
        }
        if config.server.host.is_empty() {
            result.add_error(ValidationError::new("server.host", "Host cannot be empty"));
        }
    }

    fn validate_engine(config: &Config, result: &mut ValidationResult) {
        let engine = &config.engine;
        let positive = [
            ("engine.max_duration_secs", engine.max_duration_secs as usize),
            ("engine.default_node_timeout_ms", engine.default_node_timeout_ms as usize),
            ("engine.max_loop_iterations", engine.max_loop_iterations as usize),
            ("engine.event_buffer", engine.event_buffer),
            ("engine.event_history", engine.event_history),
            ("engine.snapshot_retention", engine.snapshot_retention),
        ];
        for (path, value) in positive {
            if value == 0 {
                result.add_error(ValidationError::new(path, "must be greater than 0"));
            }
        }

        if engine.max_loop_iterations > 100_000 {
            result.add_warning(ValidationWarning::new(
                "engine.max_loop_iterations",
                "max_loop_iterations is very high (>100000), runaway loops will take long to stop",
            ));
        }
    }

    fn validate_recovery(config: &Config, result: &mut ValidationResult) {
        if config.recovery.timeout_floor_ms == 0 {
            result.add_error(ValidationError::new(
                "recovery.timeout_floor_ms",
                "timeout_floor_ms must be greater than 0",
            ));
        }
        if !config.recovery.dom_enabled
            && !config.recovery.llm_enabled
            && !config.recovery.rules_enabled
        {
            result.add_warning(ValidationWarning::new(
                "recovery",
                "all fix strategies are disabled, recovery will never succeed",
            ));
        }
    }

    fn validate_llm(config: &Config, result: &mut ValidationResult) {
        if config.recovery.llm_enabled && config.llm.api_key().is_none() {
            result.add_warning(ValidationWarning::new(
                "llm.api_key",
                "API key is not set, LLM-assisted repair will be skipped",
            ));
        }

        if let Some(ref url) = config.llm.base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                result.add_error(ValidationError::new(
                    "llm.base_url",
                    "base_url must start with http:// or https://",
                ));
            }
        }
    }

    fn validate_driver(config: &Config, result: &mut ValidationResult) {
        if !DRIVER_KINDS.contains(&config.driver.kind.as_str()) {
            result.add_error(ValidationError::new(
                "driver.kind",
                format!(
                    "Unknown driver kind '{}', valid values: {:?}",
                    config.driver.kind, DRIVER_KINDS
                ),
            ));
        }
        if config.driver.request_timeout_secs == 0 {
            result.add_error(ValidationError::new(
                "driver.request_timeout_secs",
                "request_timeout_secs must be greater than 0",
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
