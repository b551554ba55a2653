//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! listener.bind_address
//!     → tokio TcpListener (plain HTTP)
//!     → or tls.rs + axum-server (HTTPS when listener.tls is set)
//!     → Hand off to HTTP layer
//! ```

pub mod tls;

pub use tls::load_tls_config;
