//! Shared utilities for integration tests.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use hyperserve::lifecycle::{Site, SiteBuilder};
use hyperserve::{HttpServer, ModuleRegistry, ServerConfig};

pub const BUILD_ID: &str = "test-build";

/// A site directory on disk.
pub struct TestSite {
    pub dir: TempDir,
}

impl TestSite {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    /// Write `contents` to `rel` under the site directory.
    pub fn file(&self, rel: &str, contents: &str) -> &Self {
        let path = self.dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
        self
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn config(&self) -> ServerConfig {
        let mut config = ServerConfig::default();
        config.site.dir = self.dir.path().to_path_buf();
        config.deploy_hash = Some(BUILD_ID.to_string());
        config
    }

    pub async fn build(&self, config: ServerConfig, registry: ModuleRegistry) -> (axum::Router, Site) {
        let site = SiteBuilder::new(config.clone())
            .modules(registry)
            .build()
            .await
            .expect("site builds");
        let app = HttpServer::new(config, &site).into_router();
        (app, site)
    }

    pub async fn app(&self, registry: ModuleRegistry) -> axum::Router {
        self.build(self.config(), registry).await.0
    }
}

/// GET request from a browser.
pub fn browser_get(uri: &str) -> Request<Body> {
    Request::get(uri)
        .header("accept", "text/html,application/xhtml+xml")
        .body(Body::empty())
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

pub async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
