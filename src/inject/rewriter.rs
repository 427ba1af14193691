//! HTML rewriting: splice instrumentation scripts into `<head>`.
//!
//! # Responsibilities
//! - Detect documents that already carry the pre-baked error shim
//! - Build the ordered `<script>` block (inline bodies or `/__anyon/` refs)
//! - Emit console placeholders for assets that failed to load
//! - Insert right after the first `<head ...>` tag, or prepend
//!
//! Rewriting never fails: malformed documents get the block prepended.

use once_cell::sync::Lazy;
use regex::bytes::Regex;

use crate::assets::{AssetName, AssetStore};
use crate::http::ASSET_PREFIX;
use crate::inject::policy::InjectionDecision;

static HEAD_OPEN_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i-u)<head\b[^>]*>").unwrap());

/// Markers the legacy baked-in shim leaves in a document.
const LEGACY_SHIM_MARKERS: [&[u8]; 2] = [b"\"window-error\"", b"\"unhandled-rejection\""];

/// True when the document already contains the error-capture shim.
pub fn has_legacy_shim(html: &[u8]) -> bool {
    LEGACY_SHIM_MARKERS
        .iter()
        .all(|marker| contains(html, marker))
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Assets to inject into this document, in order.
pub fn injection_plan(html: &[u8]) -> Vec<AssetName> {
    let skip_shim = has_legacy_shim(html);
    if skip_shim {
        tracing::debug!("Document already carries the error shim; skipping stacktrace and shim");
    }
    AssetName::INJECTED
        .into_iter()
        .filter(|name| !(skip_shim && name.is_error_shim_pair()))
        .collect()
}

/// Build the joined script block for `plan`.
pub fn build_script_block(
    plan: &[AssetName],
    decision: &InjectionDecision,
    assets: &AssetStore,
) -> Vec<u8> {
    let nonce_attr = decision
        .nonce
        .as_deref()
        .map(|nonce| format!(" nonce=\"{}\"", nonce.replace('"', "&quot;")))
        .unwrap_or_default();

    let mut block = Vec::new();
    for (i, name) in plan.iter().enumerate() {
        if i > 0 {
            block.push(b'\n');
        }
        match assets.get(*name) {
            Some(_) if decision.use_external_scripts => {
                block.extend_from_slice(
                    format!(
                        "<script src=\"{}{}\"{}></script>",
                        ASSET_PREFIX,
                        name.file_name(),
                        nonce_attr
                    )
                    .as_bytes(),
                );
            }
            Some(content) => {
                block.extend_from_slice(b"<script>");
                block.extend_from_slice(content);
                block.extend_from_slice(b"</script>");
            }
            None => {
                block.extend_from_slice(missing_placeholder(*name, &nonce_attr).as_bytes());
            }
        }
    }
    block
}

const HTML_TO_IMAGE_DEPENDENTS: &str = "screenshot and visual editing depend on it";

fn missing_placeholder(name: AssetName, nonce_attr: &str) -> String {
    let (level, message) = if name == AssetName::HtmlToImage {
        tracing::error!(
            asset = %name,
            "html-to-image is not loaded; screenshot and visual editor clients will fail"
        );
        (
            "error",
            format!(
                "[anyon-proxy] Missing injected asset: {} ({})",
                name, HTML_TO_IMAGE_DEPENDENTS
            ),
        )
    } else {
        ("warn", format!("[anyon-proxy] Missing injected asset: {}", name))
    };
    let literal = serde_json::to_string(&message).unwrap_or_else(|_| "\"\"".to_string());
    format!("<script{}>console.{}({});</script>", nonce_attr, level, literal)
}

/// Rewrite a full HTML document.
pub fn rewrite(html: &[u8], decision: &InjectionDecision, assets: &AssetStore) -> Vec<u8> {
    let plan = injection_plan(html);
    let block = build_script_block(&plan, decision, assets);

    let mut out = Vec::with_capacity(html.len() + block.len());
    match HEAD_OPEN_TAG.find(html) {
        Some(tag) => {
            out.extend_from_slice(&html[..tag.end()]);
            out.extend_from_slice(&block);
            out.extend_from_slice(&html[tag.end()..]);
        }
        None => {
            tracing::warn!(
                document_bytes = html.len(),
                "No <head> tag found; prepending scripts to the document"
            );
            out.extend_from_slice(&block);
            out.extend_from_slice(html);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;

    fn all_assets() -> AssetStore {
        AssetStore::from_contents(
            AssetName::ALL
                .into_iter()
                .map(|n| (n, Bytes::from(format!("/*{}*/", n.file_name())))),
        )
    }

    fn text(bytes: &[u8]) -> String {
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn inline_scripts_follow_head_tag() {
        let html: &[u8] =
            b"<!doctype html><html><HEAD lang=\"en\"><title>t</title></HEAD><body></body></html>";
        let out = text(&rewrite(html, &InjectionDecision::inline(), &all_assets()));

        let expected_prefix = concat!(
            "<!doctype html><html><HEAD lang=\"en\">",
            "<script>/*stacktrace.min.js*/</script>\n<script>/*anyon-shim.js*/</script>",
        );
        assert!(out.starts_with(expected_prefix), "{}", out);
        assert!(out.ends_with("</script><title>t</title></HEAD><body></body></html>"));
        for name in AssetName::INJECTED {
            assert_eq!(out.matches(&format!("/*{}*/", name.file_name())).count(), 1);
        }
        assert!(!out.contains("anyon-sw.js*/"));
    }

    #[test]
    fn injection_order_is_fixed() {
        let out = text(&rewrite(b"<head></head>", &InjectionDecision::inline(), &all_assets()));
        let positions: Vec<usize> = AssetName::INJECTED
            .iter()
            .map(|n| out.find(&format!("/*{}*/", n.file_name())).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn header_element_is_not_head() {
        let html = b"<body><header>nav</header></body>";
        let out = text(&rewrite(html, &InjectionDecision::inline(), &all_assets()));
        assert!(out.starts_with("<script>/*stacktrace.min.js*/</script>"));
        assert!(out.ends_with("<body><header>nav</header></body>"));
    }

    #[test]
    fn missing_head_prepends_block() {
        let html = b"<p>fragment</p>";
        let out = text(&rewrite(html, &InjectionDecision::inline(), &all_assets()));
        assert!(out.starts_with("<script>"));
        assert!(out.ends_with("</script><p>fragment</p>"));
    }

    #[test]
    fn external_mode_uses_asset_urls_with_nonce() {
        let decision = InjectionDecision::external(Some("abc123".into()));
        let out = text(&rewrite(b"<head>", &decision, &all_assets()));

        assert!(out.contains(r#"<script src="/__anyon/anyon-shim.js" nonce="abc123"></script>"#));
        assert_eq!(out.matches("<script src=\"/__anyon/").count(), AssetName::INJECTED.len());
        assert_eq!(out.matches("nonce=\"abc123\"").count(), AssetName::INJECTED.len());
        assert!(!out.contains("/*"));
    }

    #[test]
    fn external_mode_without_nonce_has_no_attribute() {
        let out = text(&rewrite(b"<head>", &InjectionDecision::external(None), &all_assets()));
        assert!(out.contains(r#"<script src="/__anyon/stacktrace.min.js"></script>"#));
        assert!(!out.contains("nonce"));
    }

    #[test]
    fn legacy_shim_skips_only_the_shim_pair() {
        let html: &[u8] =
            br#"<head></head><script>post("window-error"); post("unhandled-rejection");</script>"#;
        let out = text(&rewrite(html, &InjectionDecision::inline(), &all_assets()));

        assert!(!out.contains("/*stacktrace.min.js*/"));
        assert!(!out.contains("/*anyon-shim.js*/"));
        assert!(out.contains("/*anyon-component-selector-client.js*/"));
        assert!(out.contains("/*anyon-sw-register.js*/"));
    }

    #[test]
    fn one_marker_is_not_enough() {
        assert!(!has_legacy_shim(br#"<script>"window-error"</script>"#));
        assert!(has_legacy_shim(br#""unhandled-rejection" ... "window-error""#));
    }

    #[test]
    fn missing_assets_become_console_placeholders() {
        let assets =
            AssetStore::from_contents([(AssetName::ErrorShim, Bytes::from_static(b"shim()"))]);
        let out = text(&rewrite(b"<head>", &InjectionDecision::inline(), &assets));

        assert!(out.contains("<script>shim()</script>"));
        assert!(out.contains(concat!(
            r#"<script>console.warn("[anyon-proxy] Missing injected asset: "#,
            r#"stacktrace.min.js");</script>"#,
        )));
        assert!(out.contains(r#"console.error("[anyon-proxy] Missing injected asset: html-to-"#));
        assert_eq!(out.matches("console.warn").count(), 6);
    }

    #[test]
    fn placeholders_carry_the_nonce() {
        let assets = AssetStore::default();
        let decision = InjectionDecision::external(Some("n".into()));
        let out = text(&rewrite(b"<head>", &decision, &assets));
        assert_eq!(out.matches("<script nonce=\"n\">console.").count(), AssetName::INJECTED.len());
    }

    #[test]
    fn only_first_head_is_used() {
        let html = b"<head></head><template><head></head></template>";
        let out = text(&rewrite(html, &InjectionDecision::inline(), &all_assets()));
        assert!(out.starts_with("<head><script>"));
        assert!(out.ends_with("</script></head><template><head></head></template>"));
    }

    #[test]
    fn non_utf8_bytes_survive() {
        let html = b"<head>\xe9t\xe9</head>";
        let out = rewrite(html, &InjectionDecision::inline(), &all_assets());
        assert!(out.ends_with(b"</script>\xe9t\xe9</head>"));
    }
}
