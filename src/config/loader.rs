//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::CoreConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding `auth.secret`.
pub const SECRET_ENV: &str = "KFCORE_JWT_SECRET";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
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
pub fn load_config(path: &Path) -> Result<CoreConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse, apply environment overrides, then validate.
pub fn parse_config(content: &str) -> Result<CoreConfig, ConfigError> {
    let config: CoreConfig = toml::from_str(content)?;
    finish(config, std::env::var(SECRET_ENV).ok())
}

/// Defaults plus environment overrides, validated.
pub fn default_config() -> Result<CoreConfig, ConfigError> {
    finish(CoreConfig::default(), std::env::var(SECRET_ENV).ok())
}

fn finish(mut config: CoreConfig, secret: Option<String>) -> Result<CoreConfig, ConfigError> {
    if let Some(secret) = secret.filter(|s| !s.is_empty()) {
        config.auth.secret = secret;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
