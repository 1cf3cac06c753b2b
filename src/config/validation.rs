//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate the bind address and allow-listed origin
//! - Validate route file extension lists
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::ServerConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address `{0}`")]
    BindAddress(String),

    #[error("invalid origin `{0}`: expected an absolute http(s) URL")]
    Origin(String),

    #[error("invalid metrics address `{0}`")]
    MetricsAddress(String),

    #[error("no {0} extensions configured")]
    NoExtensions(&'static str),

    #[error("extension `{0}` must not contain a dot")]
    Extension(String),

    #[error("extension `{0}` is configured as both template and script")]
    AmbiguousExtension(String),

    #[error("request timeout must be greater than zero")]
    RequestTimeout,
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if let Some(origin) = &config.origin {
        if parse_origin(origin).is_none() {
            errors.push(ValidationError::Origin(origin.clone()));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    let site = &config.site;
    if site.template_extensions.is_empty() {
        errors.push(ValidationError::NoExtensions("template"));
    }
    for ext in site.template_extensions.iter().chain(&site.script_extensions) {
        if ext.is_empty() || ext.contains('.') {
            errors.push(ValidationError::Extension(ext.clone()));
        }
    }
    for ext in &site.script_extensions {
        if site.template_extensions.contains(ext) {
            errors.push(ValidationError::AmbiguousExtension(ext.clone()));
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::RequestTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Parse an allow-listed origin. Only http and https are accepted.
pub fn parse_origin(origin: &str) -> Option<Url> {
    let url = Url::parse(origin).ok()?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Some(url),
        _ => None,
    }
}
