//! Rate My Hospital data proxy library.
//!
//! Resolves CMS / Medicare datasets across REST, Socrata and CSV upstreams
//! and serves them as one normalized JSON shape.

pub mod config;
pub mod dataset;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod photo;
pub mod resilience;
pub mod resolver;
pub mod security;
pub mod upstream;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
