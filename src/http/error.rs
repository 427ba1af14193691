//! Proxy-level failures and their plain-text responses.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Every way a single request can fail inside the proxy.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// No upstream origin was configured for this instance.
    #[error("No upstream origin configured")]
    NoUpstream,

    /// The request target could not be joined onto the upstream origin.
    #[error("Bad request target: {0}")]
    BadTarget(String),

    /// Connecting to or talking with the upstream failed before any
    /// response header reached the client.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Building the rewritten HTML response failed.
    #[error("Injection failed: {0}")]
    Injection(String),
}

impl ProxyError {
    pub fn upstream(err: &(dyn std::error::Error + 'static)) -> Self {
        ProxyError::Upstream(error_chain(err))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::NoUpstream | ProxyError::BadTarget(_) => StatusCode::BAD_REQUEST,
            ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Injection(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (
            self.status(),
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.to_string(),
        )
            .into_response()
    }
}

/// Flatten an error and its sources into one line.
///
/// hyper's client errors put the useful part (e.g. "Connection refused")
/// in the source chain, not in the top-level message.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
