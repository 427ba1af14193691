//! Injectable asset subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     asset dir → store.rs (best-effort read of every known name)
//!     → AssetStore (immutable, shared via Arc)
//!
//! Per request:
//!     /__anyon/<name> → AssetStore::resolve
//!     HTML rewrite   → AssetStore::get
//! ```
//!
//! # Design Decisions
//! - Names form a closed set known at compile time
//! - A missing file degrades to "absent", never aborts startup

pub mod name;
pub mod store;

pub use name::AssetName;
pub use store::{default_asset_dir, AssetEntry, AssetLookupError, AssetStore, JS_CONTENT_TYPE};
