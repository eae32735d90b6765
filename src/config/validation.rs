//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, body limit > 0)
//! - Check passthrough entries are usable header names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: DispatcherConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use crate::config::schema::DispatcherConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, collecting every problem.
pub fn validate_config(config: &DispatcherConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::new("timeouts.connect_secs", "must be greater than 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }
    if config.limits.max_response_body_bytes == 0 {
        errors.push(ValidationError::new(
            "limits.max_response_body_bytes",
            "must be greater than 0",
        ));
    }

    for (i, name) in config.passthrough.headers.iter().enumerate() {
        if let Some(problem) = header_token_problem(name) {
            errors.push(ValidationError::new(format!("passthrough.headers[{}]", i), problem));
        }
    }
    for (i, prefix) in config.passthrough.prefixes.iter().enumerate() {
        if let Some(problem) = header_token_problem(prefix) {
            errors.push(ValidationError::new(format!("passthrough.prefixes[{}]", i), problem));
        }
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", config.observability.log_level),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn header_token_problem(value: &str) -> Option<String> {
    if value.is_empty() {
        return Some("must not be empty".to_string());
    }
    if reqwest::header::HeaderName::from_bytes(value.as_bytes()).is_err() {
        return Some(format!("'{}' is not a valid header name", value));
    }
    if value.bytes().any(|b| b.is_ascii_uppercase()) {
        return Some(format!("'{}' must be lowercase", value));
    }
    None
}
