//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with asset routes and the forwarding fallback
//! - Wire up middleware (tracing spans, optional request timeout)
//! - Serve on a listener until shutdown, then close open tunnels

use axum::{routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::assets::AssetStore;
use crate::config::{validate_config, ConfigError, ProxyConfig, UpstreamOrigin};
use crate::http::client::{build_client, UpstreamClient};
use crate::http::error::ProxyError;
use crate::http::{assets, forward, request, ASSET_PREFIX, SERVICE_WORKER_PATH};
use crate::lifecycle::{shutdown, Shutdown};

/// Application state injected into handlers. Read-only once built.
#[derive(Clone)]
pub struct AppState {
    pub upstream: Option<Arc<UpstreamOrigin>>,
    pub assets: Arc<AssetStore>,
    pub client: UpstreamClient,
    /// Tears down upgrade tunnels when the server stops.
    pub tunnels: Shutdown,
}

impl AppState {
    pub fn require_upstream(&self) -> Result<&UpstreamOrigin, ProxyError> {
        self.upstream.as_deref().ok_or(ProxyError::NoUpstream)
    }
}

/// HTTP server for the preview proxy.
pub struct HttpServer {
    router: Router,
    tunnels: Shutdown,
}

impl HttpServer {
    /// Create a new HTTP server. Fails if the configuration is invalid,
    /// in particular if the upstream origin is not an absolute http(s) URL.
    pub fn new(config: ProxyConfig, assets: AssetStore) -> Result<Self, ConfigError> {
        validate_config(&config).map_err(ConfigError::Validation)?;

        let upstream = config
            .upstream
            .origin
            .as_deref()
            .map(UpstreamOrigin::parse)
            .transpose()
            .map_err(|e| ConfigError::Validation(vec![e]))?
            .map(Arc::new);

        match &upstream {
            Some(origin) => tracing::info!(upstream = %origin, "Upstream origin configured"),
            None => {
                tracing::warn!("No upstream origin configured; forwarded requests will get 400")
            }
        }

        let tunnels = Shutdown::new();
        let state = AppState {
            upstream,
            assets: Arc::new(assets),
            client: build_client(&config.timeouts),
            tunnels: tunnels.clone(),
        };

        let router = Self::build_router(&config, state);
        Ok(Self { router, tunnels })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route(&format!("{}{{*name}}", ASSET_PREFIX), get(assets::serve_asset))
            .route(SERVICE_WORKER_PATH, get(assets::serve_service_worker))
            .fallback(forward::proxy_handler)
            .with_state(state);

        if let Some(secs) = config.timeouts.request_secs {
            router = router.layer(TimeoutLayer::new(Duration::from_secs(secs)));
        }

        router.layer(
            TraceLayer::new_for_http().make_span_with(request::make_span::<axum::body::Body>),
        )
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown_rx` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let tunnels = self.tunnels.clone();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown::wait(shutdown_rx).await;
                tracing::info!("Shutdown signal received");
                tunnels.trigger();
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
