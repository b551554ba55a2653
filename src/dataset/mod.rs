//! Dataset schemas and row normalization.
//!
//! # Data Flow
//! ```text
//! upstream payload
//!     → row.rs (RawRow: Rest | Socrata | Csv, field access by key)
//!     → headers.rs (CSV column titles → raw keys)
//!     → normalize.rs (priority alias lists → CanonicalRow)
//!     → filter.rs (query / state / provider predicates)
//! ```
//!
//! # Design Decisions
//! - Upstream field names never leave this module; callers see CanonicalRow only
//! - Normalization is total: unknown fields are dropped, missing ones become null
//! - The same RowFilter runs inside the CSV stream and in the response builder

pub mod filter;
pub mod headers;
pub mod kind;
pub mod normalize;
pub mod row;
pub mod sample;

pub use filter::{LineFilter, RowFilter};
pub use kind::DatasetKind;
pub use normalize::normalize;
pub use row::{CanonicalRow, HcahpsRow, HospitalRow, JsonRow, RawRow};
