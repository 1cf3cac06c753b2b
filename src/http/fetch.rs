//! Server-side fetch for `load` hooks.
//!
//! Requests for the site's own origin (or with a relative URI) are run
//! through the router in-process with the caller's platform. Anything
//! else goes out over the shared HTTP client.

use axum::body::Body;
use axum::http::{Request, Uri};
use axum::response::Response;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

use crate::http::platform::Platform;
use crate::http::request::url_to_uri;
use crate::routing::Router;

/// Outbound HTTP client.
pub type HttpClient = Client<HttpConnector, Body>;

pub fn http_client() -> HttpClient {
    Client::builder(TokioExecutor::new()).build(HttpConnector::new())
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid fetch url `{0}`")]
    InvalidUrl(String),

    #[error("upstream request failed: {0}")]
    Client(#[from] hyper_util::client::legacy::Error),
}

/// Origin-aware fetch bound to one request.
#[derive(Clone)]
pub struct ServerFetch {
    origin: Url,
    router: Arc<Router>,
    platform: Arc<Platform>,
    client: HttpClient,
}

impl ServerFetch {
    pub fn new(origin: Url, router: Arc<Router>, platform: Arc<Platform>, client: HttpClient) -> Self {
        Self {
            origin,
            router,
            platform,
            client,
        }
    }

    /// GET `url`, which may be relative to the current origin.
    pub async fn get(&self, url: &str) -> Result<Response, FetchError> {
        let request = Request::get(url)
            .body(Body::empty())
            .map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
        self.fetch(request).await
    }

    pub async fn fetch(&self, mut request: Request<Body>) -> Result<Response, FetchError> {
        let target = self.resolve(request.uri())?;
        *request.uri_mut() =
            url_to_uri(&target).ok_or_else(|| FetchError::InvalidUrl(target.to_string()))?;

        if target.origin() == self.origin.origin() {
            tracing::debug!(url = %target, "In-process fetch");
            return Ok(self.router.handle(request, Arc::clone(&self.platform)).await);
        }

        tracing::debug!(url = %target, "Outbound fetch");
        let response = self.client.request(request).await?;
        let (parts, body) = response.into_parts();
        Ok(Response::from_parts(parts, Body::new(body)))
    }

    fn resolve(&self, uri: &Uri) -> Result<Url, FetchError> {
        let raw = uri.to_string();
        if uri.scheme().is_some() {
            return Url::parse(&raw).map_err(|_| FetchError::InvalidUrl(raw));
        }
        self.origin.join(&raw).map_err(|_| FetchError::InvalidUrl(raw))
    }
}
