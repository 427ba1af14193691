//! Forwarding engine.
//!
//! # Per-request states
//! ```text
//! ResolvingTarget → Connecting → StreamingRequest → AwaitingUpstreamHeaders
//!     → PassThroughBody | BufferAndRewrite → Responded
//!
//! failures: BadRequest (400) | UpstreamError (502) | InjectionFailed (500)
//! ```
//!
//! One forwarding attempt per request; nothing is retried.

use axum::body::Body;
use axum::extract::State;
use axum::http::{Method, Request, Version};
use axum::response::{IntoResponse, Response};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use std::time::Instant;

use crate::http::error::ProxyError;
use crate::http::server::AppState;
use crate::http::{request, response, websocket};
use crate::inject;
use crate::observability::metrics::{self, Mode};

/// Fallback handler: everything that is not an asset route.
pub async fn proxy_handler(State(state): State<AppState>, req: Request<Body>) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let result = if websocket::is_upgrade_request(&req) {
        websocket::tunnel(&state, req).await.map(|r| (r, Mode::Upgrade))
    } else {
        forward(&state, req).await
    };

    match result {
        Ok((resp, mode)) => {
            tracing::debug!(
                method = %method,
                path = %path,
                status = resp.status().as_u16(),
                mode = mode.as_str(),
                "Request proxied"
            );
            metrics::record_request(method.as_str(), resp.status().as_u16(), mode, start);
            resp
        }
        Err(err) => {
            tracing::warn!(method = %method, path = %path, error = %err, "Proxy request failed");
            metrics::record_request(method.as_str(), err.status().as_u16(), Mode::Error, start);
            err.into_response()
        }
    }
}

/// Forward one plain HTTP request.
pub async fn forward(state: &AppState, req: Request<Body>) -> Result<(Response, Mode), ProxyError> {
    let (parts, body) = req.into_parts();
    // HEAD answers carry no document to rewrite.
    let may_rewrite = parts.method != Method::HEAD && inject::needs_injection(parts.uri.path());

    let target = request::resolve_target(state.upstream.as_deref(), &parts.uri)?;
    let headers = request::forward_headers(&parts.headers, state.require_upstream()?, may_rewrite);

    let mut upstream_req = Request::builder()
        .method(parts.method)
        .uri(target)
        .version(Version::HTTP_11)
        .body(body)
        .map_err(|e| ProxyError::BadTarget(e.to_string()))?;
    *upstream_req.headers_mut() = headers;

    let upstream_resp = state
        .client
        .request(upstream_req)
        .await
        .map_err(|e| ProxyError::upstream(&e))?;

    if may_rewrite
        && response::status_has_body(upstream_resp.status())
        && response::is_rewritable_html(upstream_resp.headers())
    {
        let resp = rewrite_html(state, upstream_resp).await?;
        Ok((resp, Mode::Rewrite))
    } else {
        Ok((response::passthrough(upstream_resp), Mode::Passthrough))
    }
}

/// Buffer an HTML response, inject scripts and fix up its headers.
async fn rewrite_html(
    state: &AppState,
    upstream_resp: hyper::Response<Incoming>,
) -> Result<Response, ProxyError> {
    let (mut parts, body) = upstream_resp.into_parts();
    let html = body
        .collect()
        .await
        .map_err(|e| ProxyError::upstream(&e))?
        .to_bytes();

    let assets = state.assets.clone();
    let policy_headers = parts.headers.clone();
    let original_len = html.len();
    let (patched, decision) = tokio::task::spawn_blocking(move || {
        let decision = inject::decide(&policy_headers, &html);
        let patched = inject::rewrite(&html, &decision, &assets);
        (patched, decision)
    })
    .await
    .map_err(|e| ProxyError::Injection(e.to_string()))?;

    tracing::debug!(
        delivery = decision.delivery(),
        nonce = decision.nonce.is_some(),
        original_bytes = original_len,
        patched_bytes = patched.len(),
        "Injected scripts into HTML document"
    );
    metrics::record_injection(decision.delivery());

    response::prepare_rewritten_headers(&mut parts.headers, patched.len());
    Ok(Response::from_parts(parts, Body::from(patched)))
}
