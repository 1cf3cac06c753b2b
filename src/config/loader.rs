//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::ServerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding the allow-listed origin.
pub const ORIGIN_ENV: &str = "ORIGIN";

/// Environment variable carrying the build identifier.
pub const DEPLOY_HASH_ENV: &str = "DEPLOY_HASH";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: ServerConfig = toml::from_str(&content)?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment values onto a config.
///
/// `ORIGIN` replaces the configured origin; `DEPLOY_HASH` only fills an
/// unset build identifier.
pub fn apply_env_overrides<F>(config: &mut ServerConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(origin) = env(ORIGIN_ENV).filter(|v| !v.is_empty()) {
        config.origin = Some(origin);
    }
    if config.deploy_hash.is_none() {
        config.deploy_hash = env(DEPLOY_HASH_ENV).filter(|v| !v.is_empty());
    }
}
