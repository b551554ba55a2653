//! Response helpers shared by handlers.
//!
//! # Design Decisions
//! - Panics become the same JSON error body as any other unhandled error
//! - Plain-text bodies are used only where clients expect text

use std::any::Any;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::resolver::ProxyError;

/// `CatchPanicLayer` handler: 500 `{"error":"Unhandled","detail":...}`.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };
    tracing::error!(detail = %detail, "Handler panicked");
    ProxyError::Unhandled(detail).into_response()
}

pub fn text(status: StatusCode, body: &'static str) -> Response {
    (status, body).into_response()
}
