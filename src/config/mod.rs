//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, apply environment overrides)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no hot reload
//! - All fields have defaults to allow minimal configs
//! - Secrets (app token, maps key) usually arrive through the environment
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::{
    DatasetConfig, FallbackConfig, FallbackPolicy, LimitConfig, ListenerConfig,
    ObservabilityConfig, PhotoConfig, ProxyConfig, TimeoutConfig, TlsConfig, UpstreamConfig,
};
