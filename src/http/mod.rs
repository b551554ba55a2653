//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID)
//!     → handlers.rs (parse query, call resolver / photo)
//!     → response.rs (error bodies, panic handler)
//!     → CORS headers (security::headers) → client
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestUuid, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
