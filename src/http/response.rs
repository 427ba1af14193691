//! Response handling and transformation.
//!
//! # Responsibilities
//! - Decide whether an upstream response is a rewritable HTML document
//! - Stream pass-through bodies without buffering
//! - Fix up headers after the body has been rewritten
//!
//! # Design Decisions
//! - Pass-through responses keep status and headers verbatim
//! - A body error after headers were sent can only be logged; the error
//!   propagates into the server, which drops the client connection

use axum::body::Body;
use axum::http::header::{CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, ETAG, TRANSFER_ENCODING};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use http_body_util::BodyExt;
use hyper::body::Incoming;

/// True for `text/html` responses whose body is not content-encoded.
pub fn is_rewritable_html(headers: &HeaderMap) -> bool {
    let is_html = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim_start().to_ascii_lowercase().starts_with("text/html"))
        .unwrap_or(false);
    if !is_html {
        return false;
    }

    let encoded = headers
        .get_all(CONTENT_ENCODING)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|token| token.trim())
        .any(|token| !token.is_empty() && !token.eq_ignore_ascii_case("identity"));
    if encoded {
        tracing::debug!("HTML response is content-encoded; passing through unmodified");
    }
    !encoded
}

/// False for statuses that never carry a body (`1xx`, `204`, `304`).
pub fn status_has_body(status: StatusCode) -> bool {
    !(status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED)
}

/// Relay an upstream response without touching status, headers or body.
pub fn passthrough(upstream: hyper::Response<Incoming>) -> Response {
    let (parts, body) = upstream.into_parts();
    let body = body.map_err(|e| {
        tracing::warn!(
            error = %e,
            "Upstream body failed after headers were sent; terminating client connection"
        );
        e
    });
    Response::from_parts(parts, Body::new(body))
}

/// Header fix-ups for a body that was rewritten to `len` bytes.
pub fn prepare_rewritten_headers(headers: &mut HeaderMap, len: usize) {
    headers.remove(CONTENT_ENCODING);
    headers.remove(ETAG);
    headers.remove(TRANSFER_ENCODING);
    headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.append(*k, HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn html_detection() {
        assert!(is_rewritable_html(&headers(&[("content-type", "text/html")])));
        assert!(is_rewritable_html(&headers(&[("content-type", "Text/HTML; charset=utf-8")])));
        assert!(!is_rewritable_html(&headers(&[("content-type", "application/json")])));
        assert!(!is_rewritable_html(&headers(&[("content-type", "application/xhtml+xml")])));
        assert!(!is_rewritable_html(&HeaderMap::new()));
    }

    #[test]
    fn encoded_html_is_left_alone() {
        assert!(!is_rewritable_html(&headers(&[
            ("content-type", "text/html"),
            ("content-encoding", "gzip"),
        ])));
        assert!(is_rewritable_html(&headers(&[
            ("content-type", "text/html"),
            ("content-encoding", "identity"),
        ])));
    }

    #[test]
    fn rewritten_headers_describe_new_body() {
        let mut map = headers(&[
            ("content-type", "text/html"),
            ("content-encoding", "identity"),
            ("etag", "\"v1\""),
            ("transfer-encoding", "chunked"),
            ("content-length", "10"),
            ("x-frame-options", "DENY"),
        ]);
        prepare_rewritten_headers(&mut map, 1234);

        assert_eq!(map[CONTENT_LENGTH], "1234");
        assert!(!map.contains_key(CONTENT_ENCODING));
        assert!(!map.contains_key(ETAG));
        assert!(!map.contains_key(TRANSFER_ENCODING));
        assert_eq!(map["x-frame-options"], "DENY");
    }

    #[test]
    fn bodyless_statuses() {
        assert!(status_has_body(StatusCode::OK));
        assert!(status_has_body(StatusCode::NOT_FOUND));
        assert!(!status_has_body(StatusCode::NO_CONTENT));
        assert!(!status_has_body(StatusCode::NOT_MODIFIED));
        assert!(!status_has_body(StatusCode::SWITCHING_PROTOCOLS));
    }
}
