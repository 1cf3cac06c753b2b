//! Server-side rendering host.
//!
//! Discovers routes from a directory tree, compiles them into URL
//! patterns and serves them through an ordered request chain.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod manifest;
pub mod observability;
pub mod render;
pub mod routing;
pub mod security;

pub use config::schema::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::{Shutdown, Site, SiteBuilder};
pub use manifest::{ModuleRegistry, RouteModule};
