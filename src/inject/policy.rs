//! Injection policy: inline vs external script delivery.
//!
//! # Responsibilities
//! - Find the effective Content-Security-Policy (header first, then the
//!   last `<meta http-equiv>` in the document)
//! - Require external `<script src>` delivery unless the policy allows
//!   `'unsafe-inline'`
//! - Pick up an existing script nonce to reuse on injected tags
//!
//! Everything here works on raw bytes; documents need not be UTF-8.

use axum::http::header::CONTENT_SECURITY_POLICY;
use axum::http::HeaderMap;
use once_cell::sync::Lazy;
use regex::bytes::Regex;

static META_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i-u)<meta\b[^>]*>").unwrap());
static SCRIPT_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i-u)<script\b[^>]*>").unwrap());
static HTTP_EQUIV_ATTR: Lazy<Regex> = Lazy::new(|| attr_regex("http-equiv"));
static CONTENT_ATTR: Lazy<Regex> = Lazy::new(|| attr_regex("content"));
static NONCE_ATTR: Lazy<Regex> = Lazy::new(|| attr_regex("nonce"));

fn attr_regex(name: &str) -> Regex {
    Regex::new(&format!(
        r#"(?i-u)[\s/]{}\s*=\s*(?:"([^"]*)"|'([^']*)')"#,
        regex::escape(name)
    ))
    .unwrap()
}

const UNSAFE_INLINE: &str = "'unsafe-inline'";

/// How injected scripts are delivered for one response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InjectionDecision {
    /// Emit `<script src="/__anyon/...">` instead of inline bodies.
    pub use_external_scripts: bool,
    /// Nonce copied onto every injected tag (external mode only).
    pub nonce: Option<String>,
}

impl InjectionDecision {
    pub fn inline() -> Self {
        Self::default()
    }

    pub fn external(nonce: Option<String>) -> Self {
        Self {
            use_external_scripts: true,
            nonce,
        }
    }

    /// Label for logs and metrics.
    pub fn delivery(&self) -> &'static str {
        if self.use_external_scripts {
            "external"
        } else {
            "inline"
        }
    }
}

/// Decide delivery from the response headers and the buffered document.
pub fn decide(headers: &HeaderMap, html: &[u8]) -> InjectionDecision {
    let policy = header_policy(headers).or_else(|| meta_policy(html));

    match policy {
        Some(policy) if !policy.contains(UNSAFE_INLINE) => {
            InjectionDecision::external(find_script_nonce(html))
        }
        _ => InjectionDecision::inline(),
    }
}

/// First `Content-Security-Policy` header value, if non-blank.
pub fn header_policy(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(CONTENT_SECURITY_POLICY)?;
    non_blank(String::from_utf8_lossy(value.as_bytes()).into_owned())
}

/// Content of the last CSP `<meta http-equiv>` tag, if non-blank.
pub fn meta_policy(html: &[u8]) -> Option<String> {
    META_TAG
        .find_iter(html)
        .filter_map(|tag| {
            let tag = tag.as_bytes();
            let equiv = attr_value(&HTTP_EQUIV_ATTR, tag)?;
            if !equiv.trim().eq_ignore_ascii_case("content-security-policy") {
                return None;
            }
            attr_value(&CONTENT_ATTR, tag)
        })
        .last()
        .and_then(non_blank)
}

/// Nonce of the first `<script>` tag carrying one.
pub fn find_script_nonce(html: &[u8]) -> Option<String> {
    SCRIPT_TAG
        .find_iter(html)
        .find_map(|tag| attr_value(&NONCE_ATTR, tag.as_bytes()))
}

fn attr_value(attr: &Regex, tag: &[u8]) -> Option<String> {
    let caps = attr.captures(tag)?;
    let value = caps.get(1).or_else(|| caps.get(2))?;
    Some(String::from_utf8_lossy(value.as_bytes()).into_owned())
}

fn non_blank(policy: String) -> Option<String> {
    if policy.trim().is_empty() {
        None
    } else {
        Some(policy)
    }
}
