//! WebSocket (and generic `Upgrade`) proxy handling.
//!
//! # Data Flow
//! ```text
//! Client ──Upgrade req──▶ Proxy ──same req, rewritten headers──▶ Upstream
//! Client ◀──── 101 ────── Proxy ◀──────────── 101 ───────────── Upstream
//! Client ◀════ raw bytes, both directions ════▶ Upstream
//! ```
//!
//! # Design Decisions
//! - Byte-level splice, no frame parsing; any upgrade protocol works
//! - A non-101 upstream answer is relayed as a normal response
//! - Tunnels are torn down on proxy shutdown

use axum::body::Body;
use axum::http::header::{CONNECTION, UPGRADE};
use axum::http::{Request, StatusCode, Version};
use axum::response::Response;
use hyper::upgrade::{OnUpgrade, Upgraded};
use hyper_util::rt::TokioIo;
use tokio::io::{copy_bidirectional, AsyncWriteExt};
use tokio::sync::broadcast;

use crate::http::error::ProxyError;
use crate::http::request;
use crate::http::server::AppState;
use crate::lifecycle::shutdown;
use crate::observability::metrics;

/// `Connection: upgrade` together with an `Upgrade` header.
pub fn is_upgrade_request<B>(req: &Request<B>) -> bool {
    let connection_upgrade = req
        .headers()
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("upgrade"));
    connection_upgrade && req.headers().contains_key(UPGRADE)
}

/// Forward an upgrade request and, on `101`, splice both connections.
pub async fn tunnel(state: &AppState, mut req: Request<Body>) -> Result<Response, ProxyError> {
    let target = request::resolve_target(state.upstream.as_deref(), req.uri())?;
    let headers = request::forward_headers(req.headers(), state.require_upstream()?, false);
    let protocol = req
        .headers()
        .get(UPGRADE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let client_upgrade = hyper::upgrade::on(&mut req);
    let (parts, body) = req.into_parts();

    let mut upstream_req = Request::builder()
        .method(parts.method)
        .uri(target.clone())
        .version(Version::HTTP_11)
        .body(body)
        .map_err(|e| ProxyError::BadTarget(e.to_string()))?;
    *upstream_req.headers_mut() = headers;

    let mut upstream_resp = state
        .client
        .request(upstream_req)
        .await
        .map_err(|e| ProxyError::upstream(&e))?;

    if upstream_resp.status() != StatusCode::SWITCHING_PROTOCOLS {
        tracing::debug!(
            upstream = %target,
            status = upstream_resp.status().as_u16(),
            "Upstream declined upgrade; relaying response"
        );
        let (parts, body) = upstream_resp.into_parts();
        return Ok(Response::from_parts(parts, Body::new(body)));
    }

    let upstream_upgrade = hyper::upgrade::on(&mut upstream_resp);
    let mut client_resp = Response::new(Body::empty());
    *client_resp.status_mut() = StatusCode::SWITCHING_PROTOCOLS;
    *client_resp.headers_mut() = upstream_resp.headers().clone();

    tracing::debug!(upstream = %target, protocol = %protocol, "Upgrade accepted by upstream");
    tokio::spawn(splice(
        client_upgrade,
        upstream_upgrade,
        state.tunnels.subscribe(),
        target.to_string(),
    ));

    Ok(client_resp)
}

/// Wait for both sides to finish upgrading, then copy bytes until one
/// side closes, errors, or the proxy shuts down.
async fn splice(
    client: OnUpgrade,
    upstream: OnUpgrade,
    shutdown_rx: broadcast::Receiver<()>,
    target: String,
) {
    let (client, upstream) = match futures_util::future::try_join(client, upstream).await {
        Ok(pair) => pair,
        Err(e) => {
            tracing::warn!(upstream = %target, error = %e, "Upgrade handshake failed");
            return;
        }
    };

    let mut client: TokioIo<Upgraded> = TokioIo::new(client);
    let mut upstream: TokioIo<Upgraded> = TokioIo::new(upstream);
    metrics::tunnel_opened();
    tracing::debug!(upstream = %target, "Tunnel opened");

    let (sent, received) = tokio::select! {
        result = copy_bidirectional(&mut client, &mut upstream) => match result {
            Ok(counts) => counts,
            Err(e) => {
                tracing::debug!(upstream = %target, error = %e, "Tunnel closed with error");
                (0, 0)
            }
        },
        _ = shutdown::wait(shutdown_rx) => {
            tracing::debug!(upstream = %target, "Tunnel closed by shutdown");
            (0, 0)
        }
    };

    let _ = client.shutdown().await;
    let _ = upstream.shutdown().await;
    metrics::tunnel_closed(sent, received);
    tracing::debug!(
        upstream = %target,
        client_to_upstream = sent,
        upstream_to_client = received,
        "Tunnel closed"
    );
}
