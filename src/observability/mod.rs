//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! HTTP layer and resolver produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through all spans
//! - Metrics are cheap (atomic increments); recording without an installed
//!   recorder is a no-op

pub mod logging;
pub mod metrics;
