//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → /__anyon/<name>, /anyon-sw.js → assets.rs
//!     → everything else → forward.rs
//!         → request.rs (target, header rewrite)
//!         → websocket.rs (Upgrade requests)
//!         → client.rs (upstream connection)
//!         → response.rs (pass through, or buffer + inject)
//!     → Send to client
//! ```

pub mod assets;
pub mod client;
pub mod error;
pub mod forward;
pub mod request;
pub mod response;
pub mod server;
pub mod websocket;

pub use error::ProxyError;
pub use server::{AppState, HttpServer};

/// URL prefix the injected external scripts are served under.
pub const ASSET_PREFIX: &str = "/__anyon/";

/// Root-scoped service worker path.
pub const SERVICE_WORKER_PATH: &str = "/anyon-sw.js";
