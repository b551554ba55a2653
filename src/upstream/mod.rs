//! Upstream access subsystem.
//!
//! # Data Flow
//! ```text
//! RequestDescriptor
//!     → target.rs (ordered candidates: REST templates, Socrata, CSV download)
//!     → json.rs (REST / Socrata: GET, body as text, JSON rows)
//!     → metastore.rs + csv.rs (resolve distribution, stream & select CSV rows)
//!     → client.rs (UpstreamClient trait, shared reqwest client)
//! ```
//!
//! # Design Decisions
//! - One client per process, injected as `Arc<dyn UpstreamClient>`
//! - Bodies are chunk streams so CSV downloads are parsed incrementally
//! - Dropping a body stream closes the upstream connection
//! - Each failure carries a bounded snippet of the upstream body

pub mod client;
pub mod csv;
pub mod error;
pub mod json;
pub mod metastore;
pub mod target;

pub use client::{ReqwestUpstreamClient, UpstreamClient, UpstreamRequest, UpstreamResponse};
pub use error::FetchError;
pub use target::{CandidateBuilder, UpstreamKind, UpstreamTarget};
