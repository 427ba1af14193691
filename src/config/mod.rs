//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! CLI flags / env / config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; one upstream per process lifetime
//! - All fields have defaults to allow minimal configs
//! - A bad upstream origin fails startup, never a request

pub mod loader;
pub mod schema;
pub mod upstream;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AssetsConfig, ListenerConfig, ObservabilityConfig, ProxyConfig, TimeoutConfig, UpstreamConfig,
};
pub use upstream::UpstreamOrigin;
pub use validation::{validate_config, ValidationError};
