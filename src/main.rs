//! anyon preview proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────┐
//!                 │                    PREVIEW PROXY                      │
//!   Browser       │  ┌─────────┐   ┌──────────┐   ┌───────────────┐      │
//!   ──────────────┼─▶│  http   │──▶│ forward  │──▶│ upstream      │──────┼──▶ Dev
//!                 │  │ server  │   │ engine   │   │ client        │      │    server
//!                 │  └────┬────┘   └────┬─────┘   └───────────────┘      │
//!                 │       │             │ text/html navigation           │
//!                 │       ▼             ▼                                │
//!                 │  ┌─────────┐   ┌──────────┐   ┌───────────────┐      │
//!   ◀─────────────┼──│ assets  │   │  inject  │◀──│ asset store   │      │
//!                 │  │ routes  │   │ policy + │   │ (loaded once) │      │
//!                 │  └─────────┘   │ rewriter │   └───────────────┘      │
//!                 │                └──────────┘                          │
//!                 │  Upgrade requests → websocket tunnel (raw splice)    │
//!                 └──────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use anyon_proxy::assets::{default_asset_dir, AssetStore};
use anyon_proxy::config::{load_config, ProxyConfig};
use anyon_proxy::http::HttpServer;
use anyon_proxy::lifecycle::{signals, startup, Shutdown};
use anyon_proxy::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "anyon-proxy")]
#[command(about = "Forwarding proxy that instruments a dev server's HTML pages", long_about = None)]
struct Args {
    /// TOML configuration file. Flags override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to listen on.
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on.
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Upstream origin to forward to, e.g. http://localhost:5173.
    #[arg(short, long, env = "UPSTREAM_ORIGIN")]
    upstream: Option<String>,

    /// Directory holding the injectable scripts.
    #[arg(long)]
    assets_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Expose Prometheus metrics on this address.
    #[arg(long)]
    metrics_address: Option<String>,
}

impl Args {
    fn apply(self, config: &mut ProxyConfig) {
        if let Some(host) = self.host {
            config.listener.host = host;
        }
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if let Some(upstream) = self.upstream {
            config.upstream.origin = Some(upstream);
        }
        if let Some(dir) = self.assets_dir {
            config.assets.dir = Some(dir);
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
        if let Some(addr) = self.metrics_address {
            config.observability.metrics_address = Some(addr);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    args.apply(&mut config);

    logging::init(&config.observability.log_level);
    tracing::info!("anyon-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    if let Some(addr) = &config.observability.metrics_address {
        match addr.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(metrics_address = %addr, "Failed to parse metrics address"),
        }
    }

    let asset_dir = config.assets.dir.clone().unwrap_or_else(default_asset_dir);
    let assets = AssetStore::load(&asset_dir);

    let host = config.listener.host.clone();
    let bind_address = config.listener.bind_address();
    let server = HttpServer::new(config, assets)?;

    let listener = TcpListener::bind(&bind_address).await?;
    let local_addr = listener.local_addr()?;
    startup::announce(&host, local_addr);

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
