//! Request inspection helpers.
//!
//! # Responsibilities
//! - Reconstruct the absolute URL of a request
//! - Detect WebSocket upgrades
//! - Decide whether a client wants an HTML body
//!
//! # Design Decisions
//! - Origin-form URIs are resolved against the Host header
//! - Missing or malformed hosts fall back to `localhost`

use axum::body::Body;
use axum::http::{header, Method, Request, Uri};
use url::Url;

/// Absolute URL of a request.
///
/// Uses the URI directly when it is absolute (as after the proxy
/// middleware), otherwise combines the Host header with the path.
pub fn effective_url(request: &Request<Body>) -> Url {
    let uri = request.uri();
    if uri.scheme().is_some() && uri.authority().is_some() {
        if let Ok(url) = Url::parse(&uri.to_string()) {
            return url;
        }
    }

    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .filter(|h| !h.is_empty())
        .or_else(|| uri.authority().map(|a| a.as_str()))
        .unwrap_or("localhost");
    let scheme = uri.scheme_str().unwrap_or("http");
    let path = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");

    Url::parse(&format!("{}://{}{}", scheme, host, path))
        .or_else(|_| Url::parse(&format!("{}://localhost{}", scheme, path)))
        .unwrap_or_else(|_| localhost())
}

fn localhost() -> Url {
    Url::parse("http://localhost/").expect("static URL")
}

/// Convert a URL back into an HTTP URI.
pub fn url_to_uri(url: &Url) -> Option<Uri> {
    url.as_str().parse().ok()
}

/// True when the request asks to upgrade to a WebSocket.
pub fn is_websocket_upgrade(request: &Request<Body>) -> bool {
    request
        .headers()
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("websocket"))
}

/// True when the client accepts an HTML body.
pub fn accepts_html(request: &Request<Body>) -> bool {
    request
        .headers()
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.contains("text/html"))
}

/// Only GET requests from HTML-accepting clients get rendered error pages.
pub fn sends_body(request: &Request<Body>) -> bool {
    request.method() == Method::GET && accepts_html(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(uri: &str) -> axum::http::request::Builder {
        Request::builder().method(Method::GET).uri(uri)
    }

    #[test]
    fn test_effective_url_from_host_header() {
        let req = get("/about?x=1").header("host", "example.com:8080").body(Body::empty()).unwrap();
        assert_eq!(effective_url(&req).as_str(), "http://example.com:8080/about?x=1");
    }

    #[test]
    fn test_effective_url_from_absolute_uri() {
        let req = get("https://good.example/a/b").body(Body::empty()).unwrap();
        assert_eq!(effective_url(&req).as_str(), "https://good.example/a/b");
    }

    #[test]
    fn test_effective_url_without_host() {
        let req = get("/x").body(Body::empty()).unwrap();
        assert_eq!(effective_url(&req).as_str(), "http://localhost/x");
    }

    #[test]
    fn test_websocket_detection() {
        let req = get("/ws").header("upgrade", "websocket").body(Body::empty()).unwrap();
        assert!(is_websocket_upgrade(&req));
        let req = get("/ws").header("upgrade", "h2c").body(Body::empty()).unwrap();
        assert!(!is_websocket_upgrade(&req));
    }

    #[test]
    fn test_sends_body() {
        let req = get("/").header("accept", "text/html,application/xhtml+xml").body(Body::empty()).unwrap();
        assert!(sends_body(&req));

        let req = get("/").header("accept", "application/json").body(Body::empty()).unwrap();
        assert!(!sends_body(&req));

        let req = Request::builder()
            .method(Method::POST)
            .uri("/")
            .header("accept", "text/html")
            .body(Body::empty())
            .unwrap();
        assert!(!sends_body(&req));
    }
}
