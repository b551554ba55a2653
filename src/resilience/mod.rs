//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Upstream call:
//!     → timeouts.rs (per-call deadline; expiry drops the in-flight future)
//!     → On failure: resolver moves to the next candidate
//! ```
//!
//! # Design Decisions
//! - Every external call has a deadline
//! - One attempt per candidate; fallback replaces retries

pub mod timeouts;

pub use timeouts::with_deadline;
