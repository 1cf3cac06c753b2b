//! Proxy validator: the first handler in the chain.
//!
//! Resolves the URL the client actually used (via the nearest proxy's
//! forwarding headers), rejects requests for other origins and hands the
//! rewritten request to the rest of the chain.

use async_trait::async_trait;
use axum::http::StatusCode;
use url::Url;

use crate::http::request::{is_websocket_upgrade, url_to_uri};
use crate::http::response;
use crate::routing::{Exchange, Handle, HandleError};
use crate::security::origin::{forwarded_url, origin_allowed};

#[derive(Debug, Clone, Default)]
pub struct ProxyValidator {
    origin: Option<Url>,
}

impl ProxyValidator {
    /// `origin` is the allow-listed origin; `None` accepts any host.
    pub fn new(origin: Option<Url>) -> Self {
        Self { origin }
    }
}

#[async_trait]
impl Handle for ProxyValidator {
    async fn handle(&self, exchange: &mut Exchange) -> Result<(), HandleError> {
        if exchange.flags.ignore {
            return Ok(());
        }
        if is_websocket_upgrade(&exchange.request) {
            exchange.flags.ignore = true;
            return Ok(());
        }

        let url = forwarded_url(&exchange.url(), exchange.request.headers());

        if let Some(allowed) = &self.origin {
            if !origin_allowed(allowed, &url) {
                tracing::debug!(url = %url, origin = %allowed, "Origin mismatch");
                exchange.stop_propagation();
                exchange.response = Some(response::empty(StatusCode::NOT_FOUND));
                return Ok(());
            }
        }

        let uri = url_to_uri(&url)
            .ok_or_else(|| HandleError::Middleware(format!("unrepresentable request url {}", url)))?;
        *exchange.request.uri_mut() = uri;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::platform::{ConnectionInfo, Platform};
    use crate::routing::{from_fn, Router};
    use axum::body::Body;
    use axum::http::{HeaderMap, Request};
    use axum::response::IntoResponse;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn router(origin: Option<&str>, reached: Arc<AtomicBool>) -> Arc<Router> {
        let mut builder = Router::builder();
        builder.use_handler(ProxyValidator::new(origin.map(|o| Url::parse(o).unwrap())));
        builder.use_handler(from_fn(move |ex: &mut Exchange| {
            reached.store(true, Ordering::SeqCst);
            let body = format!("{}|{}", ex.url(), ex.flags.ignore);
            ex.response = Some(body.into_response());
            Ok(())
        }));
        builder.build()
    }

    fn platform() -> Arc<Platform> {
        Arc::new(Platform::new(ConnectionInfo::default(), &HeaderMap::new(), "h"))
    }

    async fn body(res: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(res.into_body(), 4096).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_forwarded_headers_rewrite_url() {
        let reached = Arc::new(AtomicBool::new(false));
        let req = Request::get("/a?b=1")
            .header("host", "127.0.0.1:8080")
            .header("x-forwarded-host", "good.example")
            .header("x-forwarded-proto", "https")
            .body(Body::empty())
            .unwrap();
        let res = router(Some("https://good.example"), reached).handle(req, platform()).await;
        assert_eq!(body(res).await, "https://good.example/a?b=1|false");
    }

    #[tokio::test]
    async fn test_origin_mismatch_halts_with_404() {
        let reached = Arc::new(AtomicBool::new(false));
        let req = Request::get("/")
            .header("host", "good.example")
            .header("x-forwarded-host", "evil.example")
            .body(Body::empty())
            .unwrap();
        let res = router(Some("http://good.example"), Arc::clone(&reached))
            .handle(req, platform())
            .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert!(!reached.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_websocket_upgrade_is_ignored() {
        let reached = Arc::new(AtomicBool::new(false));
        let req = Request::get("/socket")
            .header("host", "evil.example")
            .header("upgrade", "websocket")
            .body(Body::empty())
            .unwrap();
        let res = router(Some("http://good.example"), reached).handle(req, platform()).await;
        assert_eq!(body(res).await, "http://evil.example/socket|true");
    }
}
