//! Request handling and transformation.
//!
//! # Responsibilities
//! - Tag each request with a unique id in its tracing span
//! - Resolve the upstream target from the request path and query
//! - Rewrite `Host`/`Origin`/`Referer` so the upstream sees itself
//! - Defeat compression and conditional caching for pages we may rewrite
//!
//! # Design Decisions
//! - The request id lives in the span only; proxied headers stay untouched
//! - An unparseable `Referer` is dropped rather than leaked

use axum::http::header::{ACCEPT_ENCODING, HOST, IF_NONE_MATCH, ORIGIN, REFERER};
use axum::http::{HeaderMap, HeaderValue, Request, Uri};
use url::Url;
use uuid::Uuid;

use crate::config::UpstreamOrigin;
use crate::http::error::ProxyError;

/// Span for one request, used by the `TraceLayer`.
pub fn make_span<B>(request: &Request<B>) -> tracing::Span {
    tracing::info_span!(
        "request",
        request_id = %Uuid::new_v4(),
        method = %request.method(),
        uri = %request.uri(),
    )
}

/// Join the request's path and query onto the upstream origin.
pub fn resolve_target(upstream: Option<&UpstreamOrigin>, uri: &Uri) -> Result<Uri, ProxyError> {
    let upstream = upstream.ok_or(ProxyError::NoUpstream)?;
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    upstream
        .join(path_and_query)
        .map_err(|e| ProxyError::BadTarget(e.to_string()))
}

/// Headers to send upstream for a client request.
///
/// `may_rewrite` strips `Accept-Encoding` and `If-None-Match` so the
/// upstream answers with a full plaintext body.
pub fn forward_headers(
    client: &HeaderMap,
    upstream: &UpstreamOrigin,
    may_rewrite: bool,
) -> HeaderMap {
    let mut headers = client.clone();

    match HeaderValue::from_str(upstream.authority()) {
        Ok(host) => {
            headers.insert(HOST, host);
        }
        Err(_) => {
            headers.remove(HOST);
        }
    }

    if headers.contains_key(ORIGIN) {
        match HeaderValue::from_str(upstream.as_str()) {
            Ok(origin) => {
                headers.insert(ORIGIN, origin);
            }
            Err(_) => {
                headers.remove(ORIGIN);
            }
        }
    }

    if let Some(referer) = headers.get(REFERER) {
        match rewrite_referer(referer, upstream) {
            Some(value) => {
                headers.insert(REFERER, value);
            }
            None => {
                tracing::debug!("Dropping unparseable Referer header");
                headers.remove(REFERER);
            }
        }
    }

    if may_rewrite {
        headers.remove(ACCEPT_ENCODING);
        headers.remove(IF_NONE_MATCH);
    }

    headers
}

/// Replace the origin part of a referer, keeping path, query and fragment.
fn rewrite_referer(value: &HeaderValue, upstream: &UpstreamOrigin) -> Option<HeaderValue> {
    let mut url = Url::parse(value.to_str().ok()?).ok()?;
    if url.cannot_be_a_base() {
        return None;
    }
    url.set_scheme(upstream.scheme()).ok()?;
    url.set_host(Some(upstream.host())).ok()?;
    url.set_port(upstream.port()).ok()?;
    HeaderValue::from_str(url.as_str()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upstream() -> UpstreamOrigin {
        UpstreamOrigin::parse("http://localhost:5173").unwrap()
    }

    fn client_headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.append(*name, HeaderValue::from_str(value).unwrap());
        }
        headers
    }

    #[test]
    fn host_origin_and_referer_point_upstream() {
        let headers = forward_headers(
            &client_headers(&[
                ("host", "127.0.0.1:41000"),
                ("origin", "http://127.0.0.1:41000"),
                ("referer", "http://127.0.0.1:41000/app/page?x=1#top"),
                ("x-custom", "kept"),
            ]),
            &upstream(),
            false,
        );

        assert_eq!(headers["host"], "localhost:5173");
        assert_eq!(headers["origin"], "http://localhost:5173");
        assert_eq!(headers["referer"], "http://localhost:5173/app/page?x=1#top");
        assert_eq!(headers["x-custom"], "kept");
    }

    #[test]
    fn absent_origin_stays_absent() {
        let headers = forward_headers(&client_headers(&[("host", "a")]), &upstream(), false);
        assert!(!headers.contains_key(ORIGIN));
        assert!(!headers.contains_key(REFERER));
    }

    #[test]
    fn https_upstream_rewrites_referer_scheme() {
        let upstream = UpstreamOrigin::parse("https://app.example.com").unwrap();
        let headers = forward_headers(
            &client_headers(&[("referer", "http://127.0.0.1:9000/x")]),
            &upstream,
            false,
        );
        assert_eq!(headers["referer"], "https://app.example.com/x");
        assert_eq!(headers["host"], "app.example.com");
    }

    #[test]
    fn garbage_referer_is_dropped() {
        let headers = forward_headers(
            &client_headers(&[("referer", "not a url")]),
            &upstream(),
            false,
        );
        assert!(!headers.contains_key(REFERER));
    }

    #[test]
    fn rewritable_requests_lose_encoding_and_etag_validators() {
        let client = client_headers(&[
            ("accept-encoding", "gzip, br"),
            ("if-none-match", "\"abc\""),
            ("accept", "text/html"),
        ]);

        let rewritten = forward_headers(&client, &upstream(), true);
        assert!(!rewritten.contains_key(ACCEPT_ENCODING));
        assert!(!rewritten.contains_key(IF_NONE_MATCH));
        assert_eq!(rewritten["accept"], "text/html");

        let untouched = forward_headers(&client, &upstream(), false);
        assert_eq!(untouched[ACCEPT_ENCODING], "gzip, br");
        assert_eq!(untouched[IF_NONE_MATCH], "\"abc\"");
    }

    #[test]
    fn resolve_requires_upstream() {
        let uri: Uri = "/index.html?v=2".parse().unwrap();
        assert!(matches!(resolve_target(None, &uri), Err(ProxyError::NoUpstream)));

        let target = resolve_target(Some(&upstream()), &uri).unwrap();
        assert_eq!(target.to_string(), "http://localhost:5173/index.html?v=2");
    }
}
