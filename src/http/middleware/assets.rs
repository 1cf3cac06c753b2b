//! Static files from the site's static directory.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::path::Path;
use tower::ServiceExt;
use tower_http::services::ServeDir;

use crate::routing::{Exchange, Handle, HandleError};

/// Serves a file when one exists at the request path.
///
/// Only successful and `304 Not Modified` responses are kept; anything
/// else leaves the request unanswered for the not-found fallback.
#[derive(Debug, Clone)]
pub struct StaticAssets {
    service: ServeDir,
}

impl StaticAssets {
    pub fn new(dir: &Path) -> Self {
        Self {
            service: ServeDir::new(dir),
        }
    }
}

#[async_trait]
impl Handle for StaticAssets {
    async fn handle(&self, exchange: &mut Exchange) -> Result<(), HandleError> {
        let mut request = Request::new(Body::empty());
        *request.method_mut() = exchange.method().clone();
        *request.uri_mut() = exchange.request.uri().clone();
        *request.headers_mut() = exchange.request.headers().clone();

        let response = match self.service.clone().oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        };
        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_MODIFIED {
            exchange.response = Some(response.map(Body::new));
        }
        Ok(())
    }
}
