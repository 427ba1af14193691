//! HTML instrumentation subsystem.
//!
//! # Data Flow
//! ```text
//! buffered upstream HTML + response headers
//!     → policy.rs (CSP header / meta tag → InjectionDecision)
//!     → rewriter.rs (ordered script block, splice after <head>)
//!     → patched document
//! ```

pub mod policy;
pub mod rewriter;

pub use policy::{decide, InjectionDecision};
pub use rewriter::rewrite;

/// Whether a request path may be a top-level HTML navigation:
/// no extension on the last segment, or an `.html` extension.
pub fn needs_injection(path: &str) -> bool {
    let last = path.rsplit('/').next().unwrap_or_default();
    match last.rfind('.') {
        None => true,
        Some(_) => last.to_ascii_lowercase().ends_with(".html"),
    }
}
