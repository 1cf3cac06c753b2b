//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with a single catch-all handler
//! - Wire up middleware (tracing, timeout, body limit, request ID)
//! - Build the per-request platform and run the site's request chain
//! - Write staged cookies and record metrics
//! - Serve until a shutdown signal arrives

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::Response,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::http::platform::{ConnectionInfo, Platform};
use crate::lifecycle::{shutdown_signal, Site};
use crate::observability::metrics;
use crate::routing::Router as SiteRouter;

/// Application state injected into the handler.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<SiteRouter>,
    pub deploy_hash: Arc<str>,
    pub dev: bool,
}

/// HTTP server for a built site.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: ServerConfig, site: &Site) -> Self {
        let state = AppState {
            router: Arc::clone(&site.router),
            deploy_hash: Arc::from(site.manifest.deploy_hash.as_str()),
            dev: config.dev,
        };
        let router = Self::build_router(&config, state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        Router::new()
            .fallback(site_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The Axum router, for driving the server without a listener.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Run the server until Ctrl+C, SIGTERM or `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = shutdown_signal() => {},
                    _ = shutdown.recv() => {
                        tracing::info!("Shutdown requested");
                    },
                }
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Runs every request through the site's chain.
async fn site_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let info = ConnectionInfo {
        remote_addr: request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr),
    };
    let platform = Arc::new(Platform::new(info, request.headers(), state.deploy_hash.as_ref()));

    let response = state.router.handle(request, Arc::clone(&platform)).await;
    let response = platform.cookies.apply(response);

    let status = response.status().as_u16();
    metrics::record_request(&method, status, start);
    if state.dev {
        tracing::info!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status,
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Request served"
        );
    } else {
        tracing::debug!(request_id = %request_id, method = %method, path = %path, status, "Request served");
    }
    response
}
