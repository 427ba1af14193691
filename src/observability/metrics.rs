//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status, mode
//! - `proxy_request_duration_seconds` (histogram): latency by mode
//! - `proxy_injections_total` (counter): rewritten documents by delivery
//! - `proxy_tunnels_active` (gauge): open upgrade tunnels
//! - `proxy_tunnel_bytes_total` (counter): tunnelled bytes by direction
//! - `proxy_assets_missing` (gauge): assets that failed to load

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter")
        }
    }
}

/// How a request was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Passthrough,
    Rewrite,
    Asset,
    Upgrade,
    Error,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Passthrough => "passthrough",
            Mode::Rewrite => "rewrite",
            Mode::Asset => "asset",
            Mode::Upgrade => "upgrade",
            Mode::Error => "error",
        }
    }
}

pub fn record_request(method: &str, status: u16, mode: Mode, start: Instant) {
    metrics::counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "mode" => mode.as_str()
    )
    .increment(1);
    metrics::histogram!("proxy_request_duration_seconds", "mode" => mode.as_str())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_injection(delivery: &'static str) {
    metrics::counter!("proxy_injections_total", "delivery" => delivery).increment(1);
}

pub fn tunnel_opened() {
    metrics::gauge!("proxy_tunnels_active").increment(1.0);
}

pub fn tunnel_closed(client_to_upstream: u64, upstream_to_client: u64) {
    metrics::gauge!("proxy_tunnels_active").decrement(1.0);
    metrics::counter!("proxy_tunnel_bytes_total", "direction" => "client_to_upstream")
        .increment(client_to_upstream);
    metrics::counter!("proxy_tunnel_bytes_total", "direction" => "upstream_to_client")
        .increment(upstream_to_client);
}

pub fn set_assets_missing(count: usize) {
    metrics::gauge!("proxy_assets_missing").set(count as f64);
}
