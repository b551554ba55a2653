//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → headers.rs (preflight short-circuit)
//!     → handlers
//! Outgoing response:
//!     → headers.rs (CORS headers, unconditionally)
//! ```
//!
//! # Design Decisions
//! - The proxy serves public data to browsers: any origin is allowed
//! - Upstream tokens stay server-side and are never echoed

pub mod headers;

pub use headers::{preflight, with_cors};
