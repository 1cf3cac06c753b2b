//! Per-request state threaded through every handler.

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use std::sync::Arc;
use url::Url;

use crate::http::platform::Platform;
use crate::http::request::effective_url;
use crate::routing::matcher::Params;
use crate::routing::router::Router;

/// Transient flags for one request.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestFlags {
    /// Set for connections (e.g. WebSocket upgrades) that later
    /// middleware must pass through untouched.
    pub ignore: bool,
}

/// The request/response pair moving through the router.
///
/// Middleware read and replace `request` and `response` in place; a
/// handler that wants to end processing calls [`Exchange::stop_propagation`].
pub struct Exchange {
    pub request: Request<Body>,
    pub response: Option<Response>,
    /// Parameters captured by the pattern of the handler being invoked.
    pub params: Params,
    pub platform: Arc<Platform>,
    pub flags: RequestFlags,
    router: Arc<Router>,
    stopped: bool,
}

impl Exchange {
    pub(crate) fn new(request: Request<Body>, platform: Arc<Platform>, router: Arc<Router>) -> Self {
        Self {
            request,
            response: None,
            params: Params::new(),
            platform,
            flags: RequestFlags::default(),
            router,
            stopped: false,
        }
    }

    /// Halt the chain; no further handler runs for this request.
    pub fn stop_propagation(&mut self) {
        self.stopped = true;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// The router dispatching this request.
    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn method(&self) -> &Method {
        self.request.method()
    }

    pub fn path(&self) -> &str {
        self.request.uri().path()
    }

    /// Absolute URL of the request as currently seen by the chain.
    pub fn url(&self) -> Url {
        effective_url(&self.request)
    }

    /// Move the request out for a terminal handler.
    ///
    /// The exchange keeps a body-less copy of the request head so later
    /// middleware can still inspect method, URI and headers.
    pub fn take_request(&mut self) -> Request<Body> {
        let body = std::mem::take(self.request.body_mut());
        let mut request = Request::new(body);
        *request.method_mut() = self.request.method().clone();
        *request.uri_mut() = self.request.uri().clone();
        *request.version_mut() = self.request.version();
        *request.headers_mut() = self.request.headers().clone();
        request
    }
}
