//! Per-request platform context.
//!
//! A `Platform` is built once per request by the HTTP server, wrapped in an
//! `Arc` and never replaced while the pipeline runs. Its cookie collection
//! and property bag use interior mutability so handlers can stage cookies
//! and hand rendering globals to templates.

use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde_json::{Map, Value};
use std::net::SocketAddr;
use std::sync::{Mutex, MutexGuard, RwLock};

/// Connection details for the current request.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectionInfo {
    /// Peer address, when the transport exposes one.
    pub remote_addr: Option<SocketAddr>,
}

/// Ambient values shared by every handler of one request.
#[derive(Debug)]
pub struct Platform {
    pub info: ConnectionInfo,
    pub cookies: Cookies,
    pub deploy_hash: String,
    pub platform_props: PlatformProps,
}

impl Platform {
    /// Build the platform for an inbound request.
    pub fn new(info: ConnectionInfo, headers: &HeaderMap, deploy_hash: impl Into<String>) -> Self {
        Self {
            info,
            cookies: Cookies::from_headers(headers),
            deploy_hash: deploy_hash.into(),
            platform_props: PlatformProps::default(),
        }
    }
}

/// Cookies parsed from the request, plus any staged changes.
#[derive(Debug)]
pub struct Cookies {
    jar: Mutex<CookieJar>,
}

impl Cookies {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            jar: Mutex::new(CookieJar::from_headers(headers)),
        }
    }

    /// Value of a cookie, if present.
    pub fn get(&self, name: &str) -> Option<String> {
        self.lock().get(name).map(|c| c.value().to_string())
    }

    pub fn has(&self, name: &str) -> bool {
        self.lock().get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stage a cookie; it is sent back with the response.
    pub fn set(&self, cookie: Cookie<'static>) {
        self.update(|jar| jar.add(cookie));
    }

    /// Stage a removal cookie for `name` on path `/`.
    pub fn delete(&self, name: &str) {
        let removal = Cookie::build((name.to_string(), "")).path("/").build();
        self.update(|jar| jar.remove(removal));
    }

    /// Write staged changes to `response` as `Set-Cookie` headers.
    pub fn apply(&self, response: Response) -> Response {
        let jar = self.lock().clone();
        (jar, response).into_response()
    }

    fn update(&self, f: impl FnOnce(CookieJar) -> CookieJar) {
        let mut guard = self.lock();
        let jar = std::mem::replace(&mut *guard, CookieJar::from_headers(&HeaderMap::new()));
        *guard = f(jar);
    }

    fn lock(&self) -> MutexGuard<'_, CookieJar> {
        self.jar.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Open property bag handed to templates as render props.
#[derive(Debug, Default)]
pub struct PlatformProps {
    inner: RwLock<Map<String, Value>>,
}

impl PlatformProps {
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) {
        let mut map = self.inner.write().unwrap_or_else(|p| p.into_inner());
        map.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let map = self.inner.read().unwrap_or_else(|p| p.into_inner());
        map.get(key).cloned()
    }

    /// Copy of the current properties.
    pub fn snapshot(&self) -> Map<String, Value> {
        self.inner.read().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::header::{COOKIE, SET_COOKIE};

    fn platform_with_cookie(cookie: &'static str) -> Platform {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, cookie.parse().unwrap());
        Platform::new(ConnectionInfo::default(), &headers, "hash")
    }

    #[test]
    fn test_cookies_parsed_from_request() {
        let platform = platform_with_cookie("theme=dark; session=abc");
        assert_eq!(platform.cookies.get("theme").as_deref(), Some("dark"));
        assert!(platform.cookies.has("session"));
        assert_eq!(platform.cookies.len(), 2);
    }

    #[test]
    fn test_unchanged_cookies_are_not_echoed() {
        let platform = platform_with_cookie("theme=dark");
        let response = platform.cookies.apply(Response::new(Body::empty()));
        assert!(response.headers().get(SET_COOKIE).is_none());
    }

    #[test]
    fn test_staged_cookies_are_written() {
        let platform = platform_with_cookie("theme=dark");
        platform.cookies.set(Cookie::new("visited", "yes"));
        platform.cookies.delete("theme");

        let response = platform.cookies.apply(Response::new(Body::empty()));
        let values: Vec<_> = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert!(values.iter().any(|v| v.starts_with("visited=yes")));
        assert!(values.iter().any(|v| v.starts_with("theme=")));
        assert!(!platform.cookies.has("theme"));
    }

    #[test]
    fn test_platform_props() {
        let platform = platform_with_cookie("a=b");
        platform.platform_props.insert("answer", 42);
        assert_eq!(platform.platform_props.get("answer"), Some(Value::from(42)));
        assert_eq!(platform.platform_props.snapshot().len(), 1);
    }
}
