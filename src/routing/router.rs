//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store handlers in registration order
//! - Run every matching middleware handler for a request
//! - Run the first matching route handler (first match wins)
//! - Hand unmatched and failed requests to the fallbacks
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Plain `Vec` of entries: registration order is the evaluation order
//! - Explicit NoMatch fallback rather than silent default

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::future::BoxFuture;
use std::sync::Arc;
use thiserror::Error;

use crate::http::platform::Platform;
use crate::render::RenderError;
use crate::routing::exchange::Exchange;
use crate::routing::matcher::Pattern;

/// Boxed error returned by user-supplied handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error raised while handling a request.
#[derive(Debug, Error)]
pub enum HandleError {
    /// A route handler failed.
    #[error("route handler failed: {0}")]
    Handler(#[source] BoxError),

    /// A template route's load hook failed.
    #[error("load hook failed: {0}")]
    Load(#[source] BoxError),

    /// Template rendering failed.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// A middleware could not produce a valid response.
    #[error("{0}")]
    Middleware(String),
}

/// A step in the request chain.
#[async_trait]
pub trait Handle: Send + Sync {
    async fn handle(&self, exchange: &mut Exchange) -> Result<(), HandleError>;
}

/// Produces the response for unmatched or failed requests.
#[async_trait]
pub trait Fallback: Send + Sync {
    async fn respond(&self, exchange: Exchange) -> Response;
}

/// Fallback answering with a bare status code.
#[derive(Debug, Clone, Copy)]
pub struct StatusFallback(pub StatusCode);

#[async_trait]
impl Fallback for StatusFallback {
    async fn respond(&self, _exchange: Exchange) -> Response {
        self.0.into_response()
    }
}

/// Adapter turning a synchronous closure into a [`Handle`].
pub struct HandleFn<F>(F);

/// Wrap a synchronous closure as a handler.
pub fn from_fn<F>(f: F) -> HandleFn<F>
where
    F: Fn(&mut Exchange) -> Result<(), HandleError> + Send + Sync,
{
    HandleFn(f)
}

#[async_trait]
impl<F> Handle for HandleFn<F>
where
    F: Fn(&mut Exchange) -> Result<(), HandleError> + Send + Sync,
{
    async fn handle(&self, exchange: &mut Exchange) -> Result<(), HandleError> {
        (self.0)(exchange)
    }
}

/// When an entry takes part in a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    /// Runs for every matching request.
    Middleware,
    /// Runs only while no response exists.
    Route,
}

struct Entry {
    stage: Stage,
    method: Option<Method>,
    pattern: Pattern,
    handler: Arc<dyn Handle>,
}

impl Entry {
    fn accepts(&self, method: &Method) -> bool {
        match &self.method {
            Some(m) => m == method,
            None => true,
        }
    }
}

/// Collects entries and fallbacks during startup.
pub struct RouterBuilder {
    entries: Vec<Entry>,
    on_no_match: Arc<dyn Fallback>,
    on_error: Arc<dyn Fallback>,
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            on_no_match: Arc::new(StatusFallback(StatusCode::NOT_FOUND)),
            on_error: Arc::new(StatusFallback(StatusCode::INTERNAL_SERVER_ERROR)),
        }
    }

    /// Register middleware for every method and path.
    pub fn use_handler(&mut self, handler: impl Handle + 'static) -> &mut Self {
        self.middleware(None, Pattern::any(), handler)
    }

    /// Register middleware, optionally restricted to one method.
    pub fn middleware(
        &mut self,
        method: Option<Method>,
        pattern: Pattern,
        handler: impl Handle + 'static,
    ) -> &mut Self {
        self.push(Stage::Middleware, method, pattern, Arc::new(handler))
    }

    /// Register a terminal route handler.
    pub fn route(&mut self, method: Method, pattern: Pattern, handler: Arc<dyn Handle>) -> &mut Self {
        self.push(Stage::Route, Some(method), pattern, handler)
    }

    pub fn get(&mut self, pattern: Pattern, handler: impl Handle + 'static) -> &mut Self {
        self.route(Method::GET, pattern, Arc::new(handler))
    }

    pub fn on_no_match(&mut self, fallback: Arc<dyn Fallback>) -> &mut Self {
        self.on_no_match = fallback;
        self
    }

    pub fn on_error(&mut self, fallback: Arc<dyn Fallback>) -> &mut Self {
        self.on_error = fallback;
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Freeze the router.
    pub fn build(self) -> Arc<Router> {
        Arc::new(Router {
            entries: self.entries,
            on_no_match: self.on_no_match,
            on_error: self.on_error,
        })
    }

    fn push(
        &mut self,
        stage: Stage,
        method: Option<Method>,
        pattern: Pattern,
        handler: Arc<dyn Handle>,
    ) -> &mut Self {
        self.entries.push(Entry {
            stage,
            method,
            pattern,
            handler,
        });
        self
    }
}

/// Immutable, ordered request router.
pub struct Router {
    entries: Vec<Entry>,
    on_no_match: Arc<dyn Fallback>,
    on_error: Arc<dyn Fallback>,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Run a request through the chain and produce its response.
    pub fn handle(self: &Arc<Self>, request: Request<Body>, platform: Arc<Platform>) -> BoxFuture<'static, Response> {
        let router = Arc::clone(self);
        Box::pin(async move {
            let mut exchange = Exchange::new(request, platform, Arc::clone(&router));

            for entry in &router.entries {
                if exchange.is_stopped() {
                    break;
                }
                if entry.stage == Stage::Route && exchange.response.is_some() {
                    continue;
                }
                if !entry.accepts(exchange.method()) {
                    continue;
                }
                let Some(params) = entry.pattern.exec(exchange.path()) else {
                    continue;
                };
                exchange.params = params;

                if let Err(error) = entry.handler.handle(&mut exchange).await {
                    tracing::error!(
                        method = %exchange.method(),
                        path = %exchange.path(),
                        pattern = %entry.pattern,
                        error = %error,
                        "Request handler failed"
                    );
                    return router.on_error.respond(exchange).await;
                }
            }

            match exchange.response.take() {
                Some(response) => response,
                None => router.on_no_match.respond(exchange).await,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::platform::ConnectionInfo;
    use axum::http::HeaderMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn platform() -> Arc<Platform> {
        Arc::new(Platform::new(ConnectionInfo::default(), &HeaderMap::new(), "test"))
    }

    fn request(method: Method, path: &str) -> Request<Body> {
        Request::builder().method(method).uri(path).body(Body::empty()).unwrap()
    }

    fn respond(status: StatusCode) -> impl Handle {
        from_fn(move |ex: &mut Exchange| {
            ex.response = Some(status.into_response());
            Ok(())
        })
    }

    #[tokio::test]
    async fn test_first_route_wins() {
        let mut builder = Router::builder();
        builder.get(Pattern::parse("/a").unwrap(), respond(StatusCode::OK));
        builder.get(Pattern::parse("/:any").unwrap(), respond(StatusCode::ACCEPTED));
        let router = builder.build();

        let res = router.handle(request(Method::GET, "/a"), platform()).await;
        assert_eq!(res.status(), StatusCode::OK);

        let res = router.handle(request(Method::GET, "/b"), platform()).await;
        assert_eq!(res.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_method_mismatch_falls_through_to_no_match() {
        let mut builder = Router::builder();
        builder.route(
            Method::POST,
            Pattern::parse("/form").unwrap(),
            Arc::new(respond(StatusCode::OK)),
        );
        let router = builder.build();

        let res = router.handle(request(Method::GET, "/form"), platform()).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let res = router.handle(request(Method::POST, "/form"), platform()).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_middleware_runs_in_order_around_routes() {
        let seen = Arc::new(AtomicUsize::new(0));
        let before = Arc::clone(&seen);
        let after = Arc::clone(&seen);

        let mut builder = Router::builder();
        builder.use_handler(from_fn(move |_ex: &mut Exchange| {
            assert_eq!(before.fetch_add(1, Ordering::SeqCst), 0);
            Ok(())
        }));
        builder.get(Pattern::parse("/").unwrap(), respond(StatusCode::OK));
        builder.use_handler(from_fn(move |ex: &mut Exchange| {
            assert_eq!(after.fetch_add(1, Ordering::SeqCst), 1);
            assert!(ex.response.is_some());
            Ok(())
        }));
        let router = builder.build();

        let res = router.handle(request(Method::GET, "/"), platform()).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_stop_propagation_halts_chain() {
        let reached = Arc::new(AtomicUsize::new(0));
        let marker = Arc::clone(&reached);

        let mut builder = Router::builder();
        builder.use_handler(from_fn(|ex: &mut Exchange| {
            ex.response = Some(StatusCode::IM_A_TEAPOT.into_response());
            ex.stop_propagation();
            Ok(())
        }));
        builder.use_handler(from_fn(move |_ex: &mut Exchange| {
            marker.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));
        let router = builder.build();

        let res = router.handle(request(Method::GET, "/"), platform()).await;
        assert_eq!(res.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(reached.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_handler_error_uses_error_fallback() {
        let mut builder = Router::builder();
        builder.get(
            Pattern::parse("/throw").unwrap(),
            from_fn(|_ex: &mut Exchange| Err(HandleError::Middleware("boom".into()))),
        );
        let router = builder.build();

        let res = router.handle(request(Method::GET, "/throw"), platform()).await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_params_are_scoped_to_entry() {
        let mut builder = Router::builder();
        builder.get(
            Pattern::parse("/posts/:slug").unwrap(),
            from_fn(|ex: &mut Exchange| {
                let slug = ex.params.get("slug").cloned().unwrap_or_default();
                ex.response = Some(slug.into_response());
                Ok(())
            }),
        );
        let router = builder.build();

        let res = router.handle(request(Method::GET, "/posts/hello"), platform()).await;
        let body = axum::body::to_bytes(res.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"hello");
    }
}
