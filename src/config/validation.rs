//! Configuration validation.
//!
//! Serde handles syntax; this module checks values. Validation is a pure
//! function that reports every violation at once rather than the first one.

use std::net::SocketAddr;

use axum::http::HeaderName;

use crate::config::schema::AppConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a configuration, collecting all errors.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    let telemetry = &config.telemetry;
    if telemetry.service_name.trim().is_empty() {
        errors.push(ValidationError::new("telemetry.service_name", "must not be empty"));
    }

    // The endpoint is only checked for presence: the exporter builder owns URI parsing.
    if telemetry.enabled && telemetry.endpoint.trim().is_empty() {
        errors.push(ValidationError::new("telemetry.endpoint", "must not be empty"));
    }

    if telemetry.max_export_batch_size == 0 {
        errors.push(ValidationError::new(
            "telemetry.max_export_batch_size",
            "must be greater than zero",
        ));
    } else if telemetry.max_export_batch_size > telemetry.max_queue_size {
        errors.push(ValidationError::new(
            "telemetry.max_export_batch_size",
            format!(
                "{} exceeds max_queue_size {}",
                telemetry.max_export_batch_size, telemetry.max_queue_size
            ),
        ));
    }

    if telemetry.scheduled_delay_secs == 0 {
        errors.push(ValidationError::new(
            "telemetry.scheduled_delay_secs",
            "must be greater than zero",
        ));
    }

    if telemetry.shutdown_grace_secs == 0 {
        errors.push(ValidationError::new(
            "telemetry.shutdown_grace_secs",
            "must be greater than zero",
        ));
    }

    if let Some(header) = &telemetry.trace_response_header {
        if HeaderName::from_bytes(header.as_bytes()).is_err() {
            errors.push(ValidationError::new(
                "telemetry.trace_response_header",
                format!("'{}' is not a valid header name", header),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
