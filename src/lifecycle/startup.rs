//! Startup orchestration.
//!
//! # Responsibilities
//! - Compute the deploy hash and resolve the allow-listed origin
//! - Register component templates with the renderer
//! - Build the manifest and derive trailing-slash redirects
//! - Assemble the request chain in its fixed order
//!
//! # Design Decisions
//! - Fail fast: any manifest error is fatal
//! - Missing optional directories are warnings
//! - Everything is built before the listener accepts traffic

use axum::http::Method;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

use crate::config::validation::parse_origin;
use crate::config::ServerConfig;
use crate::http::fetch::http_client;
use crate::http::middleware::{
    register_redirects, ImmutableCache, PolicyHeaders, ProxyValidator, StaticAssets, IMMUTABLE_PATTERN,
};
use crate::manifest::{
    deploy_hash, derive_redirects, Manifest, ManifestBuilder, ManifestError, ModuleRegistry, RouteModule,
};
use crate::render::{load_components, BasicRenderer, TemplateRenderer};
use crate::routing::{Pattern, PatternError, Router};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error("failed to load components from {path}: {source}")]
    Components {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid origin `{0}`")]
    Origin(String),
}

/// A fully assembled site, ready to serve.
pub struct Site {
    pub manifest: Manifest,
    pub router: Arc<Router>,
}

/// Collects route modules and the renderer, then builds the [`Site`].
pub struct SiteBuilder {
    config: ServerConfig,
    registry: ModuleRegistry,
    renderer: Box<dyn TemplateRenderer>,
}

impl SiteBuilder {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            registry: ModuleRegistry::new(),
            renderer: Box::new(BasicRenderer::new()),
        }
    }

    /// Register the module for the route file at `path`.
    pub fn module(mut self, path: impl Into<String>, module: RouteModule) -> Self {
        self.registry.insert(path, module);
        self
    }

    pub fn modules(mut self, registry: ModuleRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Replace the built-in template renderer.
    pub fn renderer(mut self, renderer: impl TemplateRenderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    pub async fn build(self) -> Result<Site, StartupError> {
        let started = Instant::now();
        let config = self.config;
        let site = &config.site;

        let deploy_hash = deploy_hash(config.deploy_hash.as_deref());
        let origin = match &config.origin {
            Some(raw) => Some(parse_origin(raw).ok_or_else(|| StartupError::Origin(raw.clone()))?),
            None => None,
        };

        let mut renderer = self.renderer;
        let components = site.components_dir();
        load_components(renderer.as_mut(), &components, &site.template_extensions)
            .await
            .map_err(|source| StartupError::Components {
                path: components.clone(),
                source,
            })?;
        let renderer: Arc<dyn TemplateRenderer> = Arc::from(renderer);

        let mut router = Router::builder();
        router.use_handler(ProxyValidator::new(origin.clone()));

        let routes = ManifestBuilder::new(site, &self.registry, renderer, http_client(), deploy_hash.clone())
            .dev(config.dev)
            .build(&mut router)
            .await?;
        let mut manifest = Manifest {
            deploy_hash,
            routes,
            redirects: Vec::new(),
        };

        let redirects = derive_redirects(&manifest);
        for conflict in &redirects.conflicts {
            tracing::warn!(
                pattern = %conflict.canonical,
                alternate = %conflict.alternate,
                "Possible route conflict, redirect skipped"
            );
        }
        if config.dev {
            for pair in &redirects.pairs {
                tracing::info!(from = %pair.alternate, to = %pair.canonical, "308 redirect registered");
            }
        }
        register_redirects(&mut router, &redirects.pairs)?;
        manifest.redirects = redirects.pairs;

        if let Some(dir) = site.static_dir() {
            if tokio::fs::try_exists(&dir).await.unwrap_or(false) {
                router.route(Method::GET, Pattern::any(), Arc::new(StaticAssets::new(&dir)));
            } else {
                tracing::warn!(path = %dir.display(), "Missing static directory");
            }
        }

        router.middleware(Some(Method::GET), Pattern::parse(IMMUTABLE_PATTERN)?, ImmutableCache);
        router.use_handler(PolicyHeaders);

        tracing::info!(
            routes = manifest.routes.len(),
            redirects = manifest.redirects.len(),
            deploy_hash = %manifest.deploy_hash,
            origin = origin.as_ref().map(|o| o.as_str()).unwrap_or("any"),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Site ready"
        );

        Ok(Site {
            manifest,
            router: router.build(),
        })
    }
}
