//! Preview proxy library.
//!
//! Forwards HTTP and WebSocket traffic to one upstream dev server and
//! injects instrumentation scripts into top-level HTML navigations.

pub mod assets;
pub mod config;
pub mod http;
pub mod inject;
pub mod lifecycle;
pub mod observability;

pub use assets::AssetStore;
pub use config::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
