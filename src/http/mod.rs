//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, limits, timeout)
//!     → platform.rs (connection info, cookies, deploy hash, props)
//!     → routing::Router (middleware/ handlers + manifest routes)
//!     → response.rs helpers
//!     → cookies written, metrics recorded
//!     → Send to client
//! ```

pub mod fetch;
pub mod middleware;
pub mod platform;
pub mod request;
pub mod response;
pub mod server;

pub use fetch::{FetchError, ServerFetch};
pub use platform::{ConnectionInfo, Cookies, Platform, PlatformProps};
pub use server::HttpServer;
