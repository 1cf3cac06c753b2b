//! hyperserve: server-side rendering host.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────┐
//!                     │                   HYPERSERVE                      │
//!                     │                                                   │
//!   Client Request    │  ┌────────┐   ┌─────────┐   ┌────────────────┐   │
//!   ──────────────────┼─▶│  http  │──▶│  proxy  │──▶│ manifest routes│   │
//!                     │  │ server │   │validator│   │  (first match) │   │
//!                     │  └────────┘   └─────────┘   └───────┬────────┘   │
//!                     │                                     ▼            │
//!                     │               ┌──────────┐  ┌────────────────┐   │
//!                     │               │ redirects│◀─│ static assets  │   │
//!                     │               └────┬─────┘  └────────────────┘   │
//!                     │                    ▼                             │
//!   Client Response   │  ┌────────┐   ┌──────────┐                       │
//!   ◀─────────────────┼──│cookies │◀──│  policy  │                       │
//!                     │  └────────┘   └──────────┘                       │
//!                     └──────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use hyperserve::config::loader::apply_env_overrides;
use hyperserve::config::validation::validate_config;
use hyperserve::config::{load_config, ConfigError, ServerConfig};
use hyperserve::lifecycle::{Shutdown, SiteBuilder};
use hyperserve::observability::{logging, metrics};
use hyperserve::HttpServer;

#[derive(Debug, Parser)]
#[command(name = "hyperserve", version, about = "Server-side rendering host")]
struct Args {
    /// Site directory containing routes/, components/ and static/
    dir: Option<PathBuf>,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on (overrides the config file)
    #[arg(short, long)]
    bind: Option<String>,

    /// Log every registered route and request
    #[arg(long)]
    dev: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => {
            let mut config = ServerConfig::default();
            apply_env_overrides(&mut config, |key| std::env::var(key).ok());
            config
        }
    };
    if let Some(dir) = args.dir {
        config.site.dir = dir;
    }
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }
    config.dev |= args.dev;
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "hyperserve starting");
    tracing::info!(
        dir = %config.site.dir.display(),
        bind_address = %config.listener.bind_address,
        dev = config.dev,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let site = SiteBuilder::new(config.clone()).build().await?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, &site);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
