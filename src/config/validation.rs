//! Configuration validation.
//!
//! Returns all validation errors, not just the first. Runs before the
//! config is accepted into the system.

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::upstream::UpstreamOrigin;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Upstream origin is not an absolute http/https URL.
    #[error("invalid upstream origin {value:?}: {reason}")]
    InvalidUpstream { value: String, reason: String },

    /// Listener host is empty.
    #[error("listener host must not be empty")]
    EmptyHost,

    /// Metrics address does not parse as a socket address.
    #[error("invalid metrics address {0:?}")]
    InvalidMetricsAddress(String),

    /// A configured timeout of zero would fail every request.
    #[error("timeout `{0}` must be greater than zero")]
    ZeroTimeout(&'static str),
}

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.host.trim().is_empty() {
        errors.push(ValidationError::EmptyHost);
    }

    if let Some(origin) = &config.upstream.origin {
        if let Err(e) = UpstreamOrigin::parse(origin) {
            errors.push(e);
        }
    }

    if let Some(addr) = &config.observability.metrics_address {
        if addr.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidMetricsAddress(addr.clone()));
        }
    }

    if config.timeouts.connect_secs == Some(0) {
        errors.push(ValidationError::ZeroTimeout("connect_secs"));
    }
    if config.timeouts.request_secs == Some(0) {
        errors.push(ValidationError::ZeroTimeout("request_secs"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&ProxyConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = ProxyConfig::default();
        config.upstream.origin = Some("not a url".into());
        config.observability.metrics_address = Some("nowhere".into());
        config.timeouts.request_secs = Some(0);

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(matches!(errors[0], ValidationError::InvalidUpstream { .. }));
        assert_eq!(errors[1], ValidationError::InvalidMetricsAddress("nowhere".into()));
        assert_eq!(errors[2], ValidationError::ZeroTimeout("request_secs"));
    }
}
