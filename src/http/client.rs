//! Upstream HTTP client.

use axum::body::Body;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use std::time::Duration;

use crate::config::TimeoutConfig;

/// Pooled HTTP/1.1 client that can reach `http` and `https` upstreams.
pub type UpstreamClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Build the upstream client. Only the connect timeout is enforced here;
/// request timeouts, when configured, live in the router.
pub fn build_client(timeouts: &TimeoutConfig) -> UpstreamClient {
    let mut http = HttpConnector::new();
    http.enforce_http(false);
    http.set_nodelay(true);
    http.set_connect_timeout(timeouts.connect_secs.map(Duration::from_secs));

    let connector = HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_or_http()
        .enable_http1()
        .wrap_connector(http);

    Client::builder(TokioExecutor::new()).build(connector)
}
