//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM / Ctrl-C → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → every subscriber (HTTP server, TLS drain task) stops
//! ```
//!
//! # Design Decisions
//! - Tests trigger shutdown directly instead of sending signals
//! - Config is immutable, so there is no reload signal

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
