//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters, gauges, histograms via `metrics`)
//!
//! Consumers:
//!     → stdout (fmt subscriber)
//!     → Prometheus scrape endpoint (only when configured)
//! ```
//!
//! # Design Decisions
//! - Structured fields on every event
//! - Each request gets a span with a UUID request id; proxied headers are
//!   left untouched
//! - Metric calls are no-ops until an exporter is installed

pub mod logging;
pub mod metrics;
