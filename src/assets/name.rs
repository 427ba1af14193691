//! The closed set of asset names.

use std::str::FromStr;
use thiserror::Error;

/// Every asset the proxy knows how to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetName {
    Stacktrace,
    ErrorShim,
    ComponentSelector,
    HtmlToImage,
    Screenshot,
    VisualEditor,
    LogCapture,
    ServiceWorkerRegistrar,
    /// Served at `/anyon-sw.js`, never injected.
    ServiceWorker,
}

impl AssetName {
    pub const ALL: [AssetName; 9] = [
        AssetName::Stacktrace,
        AssetName::ErrorShim,
        AssetName::ComponentSelector,
        AssetName::HtmlToImage,
        AssetName::Screenshot,
        AssetName::VisualEditor,
        AssetName::LogCapture,
        AssetName::ServiceWorkerRegistrar,
        AssetName::ServiceWorker,
    ];

    /// Injection order for HTML documents.
    pub const INJECTED: [AssetName; 8] = [
        AssetName::Stacktrace,
        AssetName::ErrorShim,
        AssetName::ComponentSelector,
        AssetName::HtmlToImage,
        AssetName::Screenshot,
        AssetName::VisualEditor,
        AssetName::LogCapture,
        AssetName::ServiceWorkerRegistrar,
    ];

    /// File name on disk, also the URL segment under `/__anyon/`.
    pub fn file_name(self) -> &'static str {
        match self {
            AssetName::Stacktrace => "stacktrace.min.js",
            AssetName::ErrorShim => "anyon-shim.js",
            AssetName::ComponentSelector => "anyon-component-selector-client.js",
            AssetName::HtmlToImage => "html-to-image.js",
            AssetName::Screenshot => "anyon-screenshot-client.js",
            AssetName::VisualEditor => "anyon-visual-editor-client.js",
            AssetName::LogCapture => "anyon-log-capture-client.js",
            AssetName::ServiceWorkerRegistrar => "anyon-sw-register.js",
            AssetName::ServiceWorker => "anyon-sw.js",
        }
    }

    /// Part of the pre-baked error shim that legacy builds already carry.
    pub fn is_error_shim_pair(self) -> bool {
        matches!(self, AssetName::Stacktrace | AssetName::ErrorShim)
    }
}

impl std::fmt::Display for AssetName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Returned when a name is not part of the closed set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown asset: {0}")]
pub struct UnknownAsset(pub String);

impl FromStr for AssetName {
    type Err = UnknownAsset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AssetName::ALL
            .into_iter()
            .find(|name| name.file_name() == s)
            .ok_or_else(|| UnknownAsset(s.to_string()))
    }
}
