//! Asset and service-worker endpoints.

use axum::extract::{Path, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use std::time::Instant;

use crate::assets::{AssetName, JS_CONTENT_TYPE};
use crate::http::server::AppState;
use crate::observability::metrics::{self, Mode};

const SERVICE_WORKER_ALLOWED: HeaderName = HeaderName::from_static("service-worker-allowed");

/// `GET /__anyon/{name}`.
pub async fn serve_asset(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    let start = Instant::now();
    let response = match state.assets.resolve(&name) {
        Ok(entry) => match &entry.content {
            Some(bytes) => (
                StatusCode::OK,
                [(CONTENT_TYPE, entry.content_type), (CACHE_CONTROL, "no-cache")],
                bytes.clone(),
            )
                .into_response(),
            None => StatusCode::NOT_FOUND.into_response(),
        },
        Err(e) => {
            tracing::debug!(asset = %name, error = %e, "Asset request rejected");
            (e.status(), e.to_string()).into_response()
        }
    };
    metrics::record_request("GET", response.status().as_u16(), Mode::Asset, start);
    response
}

/// `GET /anyon-sw.js`. Served from the root so its scope can cover the
/// whole app.
pub async fn serve_service_worker(State(state): State<AppState>) -> Response {
    let start = Instant::now();
    let response = match state.assets.get(AssetName::ServiceWorker) {
        Some(bytes) => (
            StatusCode::OK,
            [
                (CONTENT_TYPE, JS_CONTENT_TYPE),
                (CACHE_CONTROL, "no-cache"),
                (SERVICE_WORKER_ALLOWED, "/"),
            ],
            bytes.clone(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "Service worker not loaded").into_response(),
    };
    metrics::record_request("GET", response.status().as_u16(), Mode::Asset, start);
    response
}
