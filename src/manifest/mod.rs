//! Route manifest subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     routes/ directory (walk.rs, sorted by file name)
//!     → pattern.rs (file path → URL pattern)
//!     → module.rs (look up the registered RouteModule)
//!     → builder.rs (Route records, /404 and /500 fallbacks, sort by order)
//!     → redirects.rs (trailing-slash alternates)
//!     → RouterBuilder
//! ```
//!
//! # Design Decisions
//! - Manifest is built once, sequentially, before the server accepts traffic
//! - Route order is `order` ascending, then discovery order
//! - Any error loading a route file aborts startup

pub mod builder;
pub mod module;
pub mod pattern;
pub mod redirects;
pub mod walk;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

use crate::http::platform::Platform;
use crate::routing::{HandleError, Params, PatternError, Router};

pub use builder::ManifestBuilder;
pub use module::{LoadHook, LoadProps, ModuleRegistry, RouteHandler, RouteModule};
pub use pattern::compile_pattern;
pub use redirects::{derive_redirects, RedirectPair, Redirects};

/// HTTP methods a route can be registered for.
///
/// Declaration order is the order handlers of one module are emitted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RouteMethod {
    Delete,
    Get,
    Patch,
    Post,
    Put,
}

impl RouteMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteMethod::Delete => "DELETE",
            RouteMethod::Get => "GET",
            RouteMethod::Patch => "PATCH",
            RouteMethod::Post => "POST",
            RouteMethod::Put => "PUT",
        }
    }

    pub fn to_method(self) -> Method {
        match self {
            RouteMethod::Delete => Method::DELETE,
            RouteMethod::Get => Method::GET,
            RouteMethod::Patch => Method::PATCH,
            RouteMethod::Post => Method::POST,
            RouteMethod::Put => Method::PUT,
        }
    }
}

impl fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a route render needs for one request.
pub struct RouteContext {
    pub request: Request<Body>,
    pub params: Params,
    pub platform: Arc<Platform>,
    /// Router serving the request, for in-process fetches.
    pub router: Arc<Router>,
}

/// Produces a route's response.
#[async_trait]
pub trait RouteRender: Send + Sync {
    /// `Ok(None)` means the route declined and routing continues.
    async fn render(&self, ctx: RouteContext) -> Result<Option<Response>, HandleError>;
}

/// One servable endpoint.
#[derive(Clone)]
pub struct Route {
    /// Fingerprint of the route file, salted with the deploy hash.
    pub hash: String,
    pub method: RouteMethod,
    pub pattern: String,
    pub render: Arc<dyn RouteRender>,
    pub order: Option<i32>,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("hash", &self.hash)
            .field("method", &self.method)
            .field("pattern", &self.pattern)
            .field("order", &self.order)
            .finish()
    }
}

/// Process-wide route table. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    pub deploy_hash: String,
    pub routes: Vec<Route>,
    pub redirects: Vec<RedirectPair>,
}

/// Error building the manifest. Always fatal at startup.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read route file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("route file {0} has no registered module")]
    MissingModule(String),

    #[error("route file {0} is not under the routes directory")]
    OutsideRoot(PathBuf),

    #[error(transparent)]
    Pattern(#[from] PatternError),
}

/// Compute the deploy hash from a build identifier, or from the current
/// time when none is configured.
pub fn deploy_hash(build_id: Option<&str>) -> String {
    let seed = match build_id {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default()
            .to_string(),
    };
    encode_hash(&[seed.as_bytes()])
}

/// Fingerprint for a route file.
pub fn route_hash(relative: &str, contents: &[u8], deploy_hash: &str) -> String {
    encode_hash(&[relative.as_bytes(), contents, deploy_hash.as_bytes()])
}

/// SHA-256 over the given parts, hex encoded.
pub fn encode_hash(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deploy_hash_is_stable_for_build_id() {
        assert_eq!(deploy_hash(Some("v1")), deploy_hash(Some("v1")));
        assert_ne!(deploy_hash(Some("v1")), deploy_hash(Some("v2")));
        assert_eq!(deploy_hash(Some("v1")).len(), 64);
    }

    #[test]
    fn test_route_hash_is_salted() {
        let a = route_hash("index.html", b"<h1>Hi</h1>", "one");
        let b = route_hash("index.html", b"<h1>Hi</h1>", "two");
        let c = route_hash("index.html", b"<h1>Bye</h1>", "one");
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_method_order() {
        let mut methods = vec![RouteMethod::Put, RouteMethod::Get, RouteMethod::Delete];
        methods.sort();
        assert_eq!(methods, vec![RouteMethod::Delete, RouteMethod::Get, RouteMethod::Put]);
        assert_eq!(RouteMethod::Patch.to_method(), Method::PATCH);
        assert_eq!(RouteMethod::Post.to_string(), "POST");
    }
}
