//! Route modules and the registry they are looked up from.
//!
//! A route file on disk only decides *where* a route lives. What it does
//! is supplied by a [`RouteModule`] registered under the file's path
//! relative to the routes root:
//!
//! ```ignore
//! let mut registry = ModuleRegistry::new();
//! registry.insert(
//!     "methods/post.rs",
//!     RouteModule::new().post(|_req, _params, _platform| async {
//!         Ok(Some(StatusCode::OK.into_response()))
//!     }),
//! );
//! ```

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::http::fetch::ServerFetch;
use crate::http::platform::Platform;
use crate::manifest::RouteMethod;
use crate::routing::{BoxError, Params};

/// A method handler exported by a route module.
#[async_trait]
pub trait RouteHandler: Send + Sync {
    /// Produce a response, or `None` to let the router keep looking.
    async fn call(
        &self,
        request: Request<Body>,
        params: Params,
        platform: Arc<Platform>,
    ) -> Result<Option<Response>, BoxError>;
}

#[async_trait]
impl<F, Fut> RouteHandler for F
where
    F: Fn(Request<Body>, Params, Arc<Platform>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<Response>, BoxError>> + Send,
{
    async fn call(
        &self,
        request: Request<Body>,
        params: Params,
        platform: Arc<Platform>,
    ) -> Result<Option<Response>, BoxError> {
        (self)(request, params, platform).await
    }
}

/// Values handed to a template route's `load` hook.
pub struct LoadProps {
    pub platform: Arc<Platform>,
    /// Fetch that routes same-origin requests back through this server.
    pub fetch: ServerFetch,
    /// Copy of the matched route parameters.
    pub params: Params,
    pub request: Request<Body>,
}

/// Data-loading hook run before a template is rendered.
///
/// Returning a response skips rendering. A `404` response is discarded so
/// the site's own not-found handling applies instead.
#[async_trait]
pub trait LoadHook: Send + Sync {
    async fn load(&self, props: LoadProps) -> Result<Option<Response>, BoxError>;
}

#[async_trait]
impl<F, Fut> LoadHook for F
where
    F: Fn(LoadProps) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<Response>, BoxError>> + Send,
{
    async fn load(&self, props: LoadProps) -> Result<Option<Response>, BoxError> {
        (self)(props).await
    }
}

/// The exports of one route file.
#[derive(Clone, Default)]
pub struct RouteModule {
    handlers: BTreeMap<RouteMethod, Arc<dyn RouteHandler>>,
    pattern: Option<String>,
    order: Option<i32>,
    load: Option<Arc<dyn LoadHook>>,
}

impl RouteModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Export a handler for `method`, replacing any earlier one.
    pub fn handler(mut self, method: RouteMethod, handler: Arc<dyn RouteHandler>) -> Self {
        self.handlers.insert(method, handler);
        self
    }

    pub fn get<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Request<Body>, Params, Arc<Platform>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<Response>, BoxError>> + Send + 'static,
    {
        self.handler(RouteMethod::Get, Arc::new(f))
    }

    pub fn post<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Request<Body>, Params, Arc<Platform>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<Response>, BoxError>> + Send + 'static,
    {
        self.handler(RouteMethod::Post, Arc::new(f))
    }

    pub fn put<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Request<Body>, Params, Arc<Platform>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<Response>, BoxError>> + Send + 'static,
    {
        self.handler(RouteMethod::Put, Arc::new(f))
    }

    pub fn patch<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Request<Body>, Params, Arc<Platform>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<Response>, BoxError>> + Send + 'static,
    {
        self.handler(RouteMethod::Patch, Arc::new(f))
    }

    pub fn delete<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Request<Body>, Params, Arc<Platform>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<Response>, BoxError>> + Send + 'static,
    {
        self.handler(RouteMethod::Delete, Arc::new(f))
    }

    /// Extra pattern: a bare extension (`.json`) or further path segments.
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Registration order; lower registers first, default 0.
    pub fn order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    pub fn load<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(LoadProps) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<Response>, BoxError>> + Send + 'static,
    {
        self.load = Some(Arc::new(f));
        self
    }

    /// Exported handlers in method order (DELETE, GET, PATCH, POST, PUT).
    pub fn handlers(&self) -> impl Iterator<Item = (RouteMethod, &Arc<dyn RouteHandler>)> {
        self.handlers.iter().map(|(method, handler)| (*method, handler))
    }

    pub fn declared_pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    pub fn declared_order(&self) -> Option<i32> {
        self.order
    }

    pub fn load_hook(&self) -> Option<&Arc<dyn LoadHook>> {
        self.load.as_ref()
    }
}

impl fmt::Debug for RouteModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteModule")
            .field("methods", &self.handlers.keys().collect::<Vec<_>>())
            .field("pattern", &self.pattern)
            .field("order", &self.order)
            .field("load", &self.load.is_some())
            .finish()
    }
}

/// Route modules keyed by route file path relative to the routes root.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, RouteModule>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `module` for the route file at `path` (forward slashes).
    pub fn insert(&mut self, path: impl Into<String>, module: RouteModule) -> &mut Self {
        let path = path.into().trim_start_matches('/').to_string();
        self.modules.insert(path, module);
        self
    }

    pub fn get(&self, path: &str) -> Option<&RouteModule> {
        self.modules.get(path)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    #[test]
    fn test_handlers_iterate_in_method_order() {
        let module = RouteModule::new()
            .put(|_, _, _| async { Ok(None) })
            .delete(|_, _, _| async { Ok(None) })
            .get(|_, _, _| async { Ok(None) });

        let methods: Vec<_> = module.handlers().map(|(m, _)| m).collect();
        assert_eq!(methods, vec![RouteMethod::Delete, RouteMethod::Get, RouteMethod::Put]);
    }

    #[test]
    fn test_declared_exports() {
        let module = RouteModule::new().pattern(".json").order(-1);
        assert_eq!(module.declared_pattern(), Some(".json"));
        assert_eq!(module.declared_order(), Some(-1));
        assert!(module.load_hook().is_none());
    }

    #[test]
    fn test_registry_normalizes_leading_slash() {
        let mut registry = ModuleRegistry::new();
        registry.insert("/api/ping.rs", RouteModule::new());
        assert!(registry.get("api/ping.rs").is_some());
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_closure_handler_is_callable() {
        let module = RouteModule::new().post(|_req, params, _platform| async move {
            let id = params.get("id").cloned().unwrap_or_default();
            Ok(Some((StatusCode::CREATED, id).into_response()))
        });
        let (_, handler) = module.handlers().next().unwrap();

        let platform = Arc::new(Platform::new(
            Default::default(),
            &axum::http::HeaderMap::new(),
            "hash",
        ));
        let mut params = Params::new();
        params.insert("id".into(), "7".into());
        let res = handler
            .call(Request::new(Body::empty()), params, platform)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
    }
}
