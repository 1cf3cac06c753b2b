//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the site host.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration for the site host.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Site layout on disk.
    pub site: SiteConfig,

    /// Allow-listed public origin (e.g., "https://example.com").
    /// Requests whose effective origin differs are answered with 404.
    pub origin: Option<String>,

    /// Build identifier used to seed the deploy hash.
    /// Falls back to the process start time when unset.
    pub deploy_hash: Option<String>,

    /// Development mode (verbose route logging).
    pub dev: bool,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request hardening.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Site directory layout.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Base directory; the other paths are resolved against it.
    pub dir: PathBuf,

    /// Route tree, relative to `dir`.
    pub routes: String,

    /// Component templates, relative to `dir`.
    pub components: String,

    /// Static assets, relative to `dir`. `None` disables static serving.
    pub static_dir: Option<String>,

    /// Extensions of template route files.
    pub template_extensions: Vec<String>,

    /// Extensions of script route files (handlers come from the module registry).
    pub script_extensions: Vec<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            routes: "routes".to_string(),
            components: "components".to_string(),
            static_dir: Some("static".to_string()),
            template_extensions: vec!["html".to_string(), "ssr".to_string()],
            script_extensions: vec!["rs".to_string()],
        }
    }
}

impl SiteConfig {
    pub fn routes_dir(&self) -> PathBuf {
        self.resolve(&self.routes)
    }

    pub fn components_dir(&self) -> PathBuf {
        self.resolve(&self.components)
    }

    pub fn static_dir(&self) -> Option<PathBuf> {
        self.static_dir.as_deref().map(|dir| self.resolve(dir))
    }

    fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.dir.join(relative)
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
