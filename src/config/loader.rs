//! Configuration loading from disk and environment.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut config: AppConfig = toml::from_str(&content)?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load the configuration the binary runs with: the file when given,
/// otherwise defaults, then environment overrides, then validation.
pub fn load(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => {
            let mut config = AppConfig::default();
            apply_env_overrides(&mut config, |key| std::env::var(key).ok());
            validate_config(&config).map_err(ConfigError::Validation)?;
            Ok(config)
        }
    }
}

/// Apply the standard `OTEL_*` variables on top of a loaded config.
///
/// `lookup` abstracts the environment so the mapping can be tested.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(enabled) = lookup("OTEL_ENABLED") {
        config.telemetry.enabled = !matches!(
            enabled.trim().to_ascii_lowercase().as_str(),
            "false" | "0" | "no" | "off"
        );
    }
    if let Some(name) = lookup("OTEL_SERVICE_NAME") {
        config.telemetry.service_name = name;
    }
    if let Some(endpoint) = lookup("OTEL_EXPORTER_OTLP_ENDPOINT") {
        config.telemetry.endpoint = endpoint;
    }
    if let Some(header) = lookup("OTEL_RESPONSE_TRACE_HEADER_NAME") {
        config.telemetry.trace_response_header = if header.trim().is_empty() {
            None
        } else {
            Some(header)
        };
    }
}
