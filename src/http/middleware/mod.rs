//! Built-in request chain handlers.
//!
//! Registration order (see `lifecycle::startup`):
//! ```text
//! proxy.rs      middleware  rewrite URL from X-Forwarded-*, enforce origin
//! (routes)      route       manifest routes, sorted by order
//! redirect.rs   route       trailing-slash 308s
//! assets.rs     route       static files
//! cache.rs      middleware  cache-control for /_/immutable/*
//! policy.rs     middleware  CSP and security headers
//! ```

pub mod assets;
pub mod cache;
pub mod policy;
pub mod proxy;
pub mod redirect;

pub use assets::StaticAssets;
pub use cache::{ImmutableCache, IMMUTABLE_PATTERN};
pub use policy::PolicyHeaders;
pub use proxy::ProxyValidator;
pub use redirect::{register_redirects, TrailingSlashRedirect};
