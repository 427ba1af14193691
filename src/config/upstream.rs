//! The remembered upstream origin.

use axum::http::Uri;
use url::Url;

use crate::config::validation::ValidationError;

/// A validated absolute `http`/`https` origin.
///
/// Only the origin of the configured URL is kept; any path, query or
/// fragment is discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamOrigin {
    url: Url,
    origin: String,
    authority: String,
}

impl UpstreamOrigin {
    /// Parse and validate an upstream origin string.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidUpstream {
            value: input.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(input.trim()).map_err(|e| invalid(&e.to_string()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(invalid("scheme must be http or https"));
        }
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| invalid("missing host"))?;

        let authority = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        let origin = url.origin().ascii_serialization();

        Ok(Self {
            url,
            origin,
            authority,
        })
    }

    /// `scheme://host[:port]`, default ports elided.
    pub fn as_str(&self) -> &str {
        &self.origin
    }

    /// Value for the forwarded `Host` header.
    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    /// Explicit port, if the configured URL carried a non-default one.
    pub fn port(&self) -> Option<u16> {
        self.url.port()
    }

    /// Join a request path and query onto the origin.
    pub fn join(&self, path_and_query: &str) -> Result<Uri, axum::http::uri::InvalidUri> {
        if path_and_query.starts_with('/') {
            format!("{}{}", self.origin, path_and_query).parse()
        } else {
            format!("{}/{}", self.origin, path_and_query).parse()
        }
    }
}

impl std::fmt::Display for UpstreamOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.origin)
    }
}
