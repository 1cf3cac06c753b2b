//! Route discovery and registration.

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::Response;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::SiteConfig;
use crate::http::fetch::{HttpClient, ServerFetch};
use crate::http::request::{effective_url, sends_body};
use crate::http::response;
use crate::manifest::module::{LoadHook, LoadProps, ModuleRegistry, RouteHandler, RouteModule};
use crate::manifest::pattern::compile_pattern;
use crate::manifest::walk::{has_extension, walk_files};
use crate::manifest::{route_hash, ManifestError, Route, RouteContext, RouteMethod, RouteRender};
use crate::render::{Props, TemplateRenderer};
use crate::routing::{Exchange, Fallback, Handle, HandleError, Params, Pattern, RouterBuilder};

const NOT_FOUND_PATTERN: &str = "/404";
const ERROR_PATTERN: &str = "/500";

/// Walks the routes directory and registers what it finds.
pub struct ManifestBuilder<'a> {
    site: &'a SiteConfig,
    registry: &'a ModuleRegistry,
    renderer: Arc<dyn TemplateRenderer>,
    client: HttpClient,
    deploy_hash: String,
    dev: bool,
}

impl<'a> ManifestBuilder<'a> {
    pub fn new(
        site: &'a SiteConfig,
        registry: &'a ModuleRegistry,
        renderer: Arc<dyn TemplateRenderer>,
        client: HttpClient,
        deploy_hash: impl Into<String>,
    ) -> Self {
        Self {
            site,
            registry,
            renderer,
            client,
            deploy_hash: deploy_hash.into(),
            dev: false,
        }
    }

    /// Log every registered route.
    pub fn dev(mut self, dev: bool) -> Self {
        self.dev = dev;
        self
    }

    /// Discover routes, register them with `router` in final order and
    /// install the `/404` and `/500` templates as fallbacks.
    ///
    /// Returns the registered routes. A missing routes directory is a
    /// warning and yields no routes.
    pub async fn build(&self, router: &mut RouterBuilder) -> Result<Vec<Route>, ManifestError> {
        let root = self.site.routes_dir();
        if !tokio::fs::try_exists(&root).await.unwrap_or(false) {
            tracing::warn!(path = %root.display(), "Missing routes directory");
            return Ok(Vec::new());
        }

        let mut extensions = self.site.template_extensions.clone();
        extensions.extend(self.site.script_extensions.iter().cloned());
        let files = walk_files(&root, &extensions)
            .await
            .map_err(|source| ManifestError::Walk {
                path: root.clone(),
                source,
            })?;

        let mut routes = Vec::new();
        for path in files {
            self.load_file(&root, &path, router, &mut routes).await?;
        }

        routes.sort_by_key(|route| route.order.unwrap_or(0));

        for route in &routes {
            let pattern = Pattern::parse(&route.pattern)?;
            router.route(
                route.method.to_method(),
                pattern,
                Arc::new(RouteEntry {
                    render: Arc::clone(&route.render),
                }),
            );
            if self.dev {
                tracing::info!(method = %route.method, pattern = %route.pattern, "Route registered");
            }
        }

        tracing::debug!(count = routes.len(), "Routes registered");
        Ok(routes)
    }

    async fn load_file(
        &self,
        root: &Path,
        path: &Path,
        router: &mut RouterBuilder,
        routes: &mut Vec<Route>,
    ) -> Result<(), ManifestError> {
        let relative = relative_key(root, path)?;
        let contents = tokio::fs::read(path).await.map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let hash = route_hash(&relative, &contents, &self.deploy_hash);

        let is_template = has_extension(path, &self.site.template_extensions);
        let module = match self.registry.get(&relative) {
            Some(module) => module.clone(),
            None if is_template => RouteModule::new(),
            None => return Err(ManifestError::MissingModule(relative)),
        };
        let pattern = compile_pattern(&relative, module.declared_pattern());

        if !is_template {
            for (method, handler) in module.handlers() {
                routes.push(Route {
                    hash: hash.clone(),
                    method,
                    pattern: pattern.clone(),
                    render: Arc::new(MethodRender {
                        handler: Arc::clone(handler),
                    }),
                    order: module.declared_order(),
                });
            }
            return Ok(());
        }

        let template = String::from_utf8_lossy(&contents).into_owned();
        let render: Arc<dyn RouteRender> = Arc::new(TemplateRender {
            template,
            load: module.load_hook().cloned(),
            renderer: Arc::clone(&self.renderer),
            client: self.client.clone(),
        });

        match pattern.as_str() {
            NOT_FOUND_PATTERN => {
                router.on_no_match(Arc::new(TemplateFallback {
                    render,
                    status: StatusCode::NOT_FOUND,
                }));
            }
            ERROR_PATTERN => {
                router.on_error(Arc::new(TemplateFallback {
                    render,
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                }));
            }
            _ => routes.push(Route {
                hash,
                method: RouteMethod::Get,
                pattern,
                render,
                order: module.declared_order(),
            }),
        }
        Ok(())
    }
}

/// Registry key for a route file: relative path with forward slashes.
fn relative_key(root: &Path, path: &Path) -> Result<String, ManifestError> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| ManifestError::OutsideRoot(path.to_path_buf()))?;
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        return Err(ManifestError::OutsideRoot(PathBuf::from(path)));
    }
    Ok(parts.join("/"))
}

/// Router entry that runs a route's render.
struct RouteEntry {
    render: Arc<dyn RouteRender>,
}

#[async_trait]
impl Handle for RouteEntry {
    async fn handle(&self, exchange: &mut Exchange) -> Result<(), HandleError> {
        let ctx = RouteContext {
            request: exchange.take_request(),
            params: exchange.params.clone(),
            platform: Arc::clone(&exchange.platform),
            router: Arc::clone(exchange.router()),
        };
        if let Some(response) = self.render.render(ctx).await? {
            exchange.response = Some(response);
        }
        Ok(())
    }
}

/// Render for a script route's exported method.
struct MethodRender {
    handler: Arc<dyn RouteHandler>,
}

#[async_trait]
impl RouteRender for MethodRender {
    async fn render(&self, ctx: RouteContext) -> Result<Option<Response>, HandleError> {
        self.handler
            .call(ctx.request, ctx.params, ctx.platform)
            .await
            .map_err(HandleError::Handler)
    }
}

/// Render for a template route.
struct TemplateRender {
    template: String,
    load: Option<Arc<dyn LoadHook>>,
    renderer: Arc<dyn TemplateRenderer>,
    client: HttpClient,
}

#[async_trait]
impl RouteRender for TemplateRender {
    async fn render(&self, ctx: RouteContext) -> Result<Option<Response>, HandleError> {
        let platform = ctx.platform;

        if let Some(load) = &self.load {
            let origin = effective_url(&ctx.request);
            let props = LoadProps {
                platform: Arc::clone(&platform),
                fetch: ServerFetch::new(origin, ctx.router, Arc::clone(&platform), self.client.clone()),
                params: ctx.params,
                request: ctx.request,
            };
            if let Some(response) = load.load(props).await.map_err(HandleError::Load)? {
                if response.status() == StatusCode::NOT_FOUND {
                    return Ok(None);
                }
                return Ok(Some(response));
            }
        }

        let props = platform.platform_props.snapshot();
        let mut globals = Props::new();
        globals.insert("deployHash".to_string(), Value::String(platform.deploy_hash.clone()));

        let html = self.renderer.render(&self.template, &props, &globals).await?;
        Ok(Some(response::html(StatusCode::OK, html)))
    }
}

/// Renders the `/404` or `/500` template for clients that want HTML.
struct TemplateFallback {
    render: Arc<dyn RouteRender>,
    status: StatusCode,
}

#[async_trait]
impl Fallback for TemplateFallback {
    async fn respond(&self, mut exchange: Exchange) -> Response {
        if !sends_body(&exchange.request) {
            return response::empty(self.status);
        }

        let ctx = RouteContext {
            request: exchange.take_request(),
            params: Params::new(),
            platform: Arc::clone(&exchange.platform),
            router: Arc::clone(exchange.router()),
        };
        let rendered = match self.render.render(ctx).await {
            Ok(Some(rendered)) => rendered,
            Ok(None) => return response::empty(self.status),
            Err(error) => {
                tracing::error!(status = %self.status, error = %error, "Fallback template failed");
                return response::empty(self.status);
            }
        };

        match axum::body::to_bytes(rendered.into_body(), usize::MAX).await {
            Ok(body) => response::html(self.status, body),
            Err(error) => {
                tracing::error!(status = %self.status, error = %error, "Fallback body unreadable");
                response::empty(self.status)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::fetch::http_client;
    use crate::render::BasicRenderer;
    use std::fs;

    fn site(dir: &Path) -> SiteConfig {
        SiteConfig {
            dir: dir.to_path_buf(),
            ..SiteConfig::default()
        }
    }

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join("routes").join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    async fn build(dir: &Path, registry: &ModuleRegistry) -> Result<Vec<Route>, ManifestError> {
        let site = site(dir);
        let mut router = RouterBuilder::new();
        ManifestBuilder::new(&site, registry, Arc::new(BasicRenderer::new()), http_client(), "hash")
            .build(&mut router)
            .await
    }

    #[tokio::test]
    async fn test_missing_routes_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let routes = build(dir.path(), &ModuleRegistry::new()).await.unwrap();
        assert!(routes.is_empty());
    }

    #[tokio::test]
    async fn test_templates_and_fallbacks() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "index.html", "home");
        write(dir.path(), "about.html", "about");
        write(dir.path(), "404.html", "missing");
        write(dir.path(), "500.html", "broken");

        let routes = build(dir.path(), &ModuleRegistry::new()).await.unwrap();
        let patterns: Vec<_> = routes.iter().map(|r| r.pattern.as_str()).collect();
        assert_eq!(patterns, vec!["/about", "/"]);
        assert!(routes.iter().all(|r| r.method == RouteMethod::Get));
        assert_ne!(routes[0].hash, routes[1].hash);
    }

    #[tokio::test]
    async fn test_script_module_emits_route_per_method() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "api/items.rs", "");

        let mut registry = ModuleRegistry::new();
        registry.insert(
            "api/items.rs",
            RouteModule::new()
                .put(|_, _, _| async { Ok(None) })
                .get(|_, _, _| async { Ok(None) }),
        );

        let routes = build(dir.path(), &registry).await.unwrap();
        let methods: Vec<_> = routes.iter().map(|r| r.method).collect();
        assert_eq!(methods, vec![RouteMethod::Get, RouteMethod::Put]);
        assert!(routes.iter().all(|r| r.pattern == "/api/items"));
        assert_eq!(routes[0].hash, routes[1].hash);
    }

    #[tokio::test]
    async fn test_script_without_module_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "orphan.rs", "");

        let err = build(dir.path(), &ModuleRegistry::new()).await.unwrap_err();
        assert!(matches!(err, ManifestError::MissingModule(path) if path == "orphan.rs"));
    }

    #[tokio::test]
    async fn test_routes_sorted_by_order_then_discovery() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.html", "");
        write(dir.path(), "b.html", "");
        write(dir.path(), "c.html", "");

        let mut registry = ModuleRegistry::new();
        registry.insert("c.html", RouteModule::new().order(-1));
        registry.insert("a.html", RouteModule::new().order(1));

        let routes = build(dir.path(), &registry).await.unwrap();
        let patterns: Vec<_> = routes.iter().map(|r| r.pattern.as_str()).collect();
        assert_eq!(patterns, vec!["/c", "/b", "/a"]);
    }

    #[test]
    fn test_relative_key_uses_forward_slashes() {
        let root = Path::new("/site/routes");
        let path = root.join("blog").join("[slug]").join("index.html");
        assert_eq!(relative_key(root, &path).unwrap(), "blog/[slug]/index.html");
    }
}
