//! Asset loading and lookup.
//!
//! # Responsibilities
//! - Read every known asset once at startup
//! - Record unreadable files as absent (warning, not an error)
//! - Resolve raw URL segments to loaded bytes for the serving endpoint

use axum::body::Bytes;
use axum::http::StatusCode;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::assets::name::AssetName;
use crate::observability::metrics;

/// Content type every asset is served with.
pub const JS_CONTENT_TYPE: &str = "application/javascript; charset=utf-8";

/// A single named asset.
#[derive(Debug, Clone)]
pub struct AssetEntry {
    pub name: AssetName,
    /// `None` when the file could not be read at startup.
    pub content: Option<Bytes>,
    pub content_type: &'static str,
}

/// Why a lookup by raw name failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssetLookupError {
    /// Name contains a path separator or `..`.
    #[error("invalid asset name")]
    InvalidName,

    /// Name is not part of the known set.
    #[error("asset not found")]
    Unknown,

    /// Name is known but the file was not loaded.
    #[error("asset not loaded")]
    NotLoaded,
}

impl AssetLookupError {
    pub fn status(&self) -> StatusCode {
        match self {
            AssetLookupError::InvalidName => StatusCode::BAD_REQUEST,
            AssetLookupError::Unknown | AssetLookupError::NotLoaded => StatusCode::NOT_FOUND,
        }
    }
}

/// Read-only table of loaded assets, shared across requests.
#[derive(Debug, Clone, Default)]
pub struct AssetStore {
    entries: HashMap<AssetName, AssetEntry>,
}

impl AssetStore {
    /// Load every known asset from `dir`. Never fails.
    pub fn load(dir: &Path) -> Self {
        let mut entries = HashMap::with_capacity(AssetName::ALL.len());
        let mut missing = 0usize;

        for name in AssetName::ALL {
            let path = dir.join(name.file_name());
            let content = match std::fs::read(&path) {
                Ok(bytes) => Some(Bytes::from(bytes)),
                Err(e) => {
                    missing += 1;
                    tracing::warn!(
                        asset = %name,
                        path = %path.display(),
                        error = %e,
                        "Failed to load injectable asset; it will be omitted"
                    );
                    None
                }
            };
            entries.insert(
                name,
                AssetEntry {
                    name,
                    content,
                    content_type: JS_CONTENT_TYPE,
                },
            );
        }

        tracing::info!(
            dir = %dir.display(),
            loaded = AssetName::ALL.len() - missing,
            missing,
            "Assets loaded"
        );
        metrics::set_assets_missing(missing);

        Self { entries }
    }

    /// Build a store from in-memory contents; names not given are absent.
    pub fn from_contents<I>(contents: I) -> Self
    where
        I: IntoIterator<Item = (AssetName, Bytes)>,
    {
        let mut entries: HashMap<AssetName, AssetEntry> = AssetName::ALL
            .into_iter()
            .map(|name| {
                (
                    name,
                    AssetEntry {
                        name,
                        content: None,
                        content_type: JS_CONTENT_TYPE,
                    },
                )
            })
            .collect();
        for (name, bytes) in contents {
            if let Some(entry) = entries.get_mut(&name) {
                entry.content = Some(bytes);
            }
        }
        Self { entries }
    }

    /// Loaded bytes for `name`, if present.
    pub fn get(&self, name: AssetName) -> Option<&Bytes> {
        self.entries.get(&name).and_then(|e| e.content.as_ref())
    }

    /// Resolve a raw URL segment. Traversal attempts are rejected before
    /// the closed set is consulted.
    pub fn resolve(&self, raw: &str) -> Result<&AssetEntry, AssetLookupError> {
        if raw.contains('/') || raw.contains('\\') || raw.contains("..") {
            return Err(AssetLookupError::InvalidName);
        }
        let name: AssetName = raw.parse().map_err(|_| AssetLookupError::Unknown)?;
        match self.entries.get(&name) {
            Some(entry) if entry.content.is_some() => Ok(entry),
            _ => Err(AssetLookupError::NotLoaded),
        }
    }
}

/// Default asset directory: `injected/` next to the running executable.
pub fn default_asset_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.join("injected")))
        .unwrap_or_else(|| PathBuf::from("injected"))
}
