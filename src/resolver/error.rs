//! Request-level errors and their HTTP rendering.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::upstream::{FetchError, UpstreamKind};

/// One failed candidate, as reported in diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attempt {
    pub upstream: UpstreamKind,
    pub url: String,
    pub error: String,
}

impl Attempt {
    pub fn new(upstream: UpstreamKind, url: impl Into<String>, error: &FetchError) -> Self {
        Self {
            upstream,
            url: url.into(),
            error: error.to_string(),
        }
    }
}

/// Errors surfaced to the caller.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Missing or malformed parameters; no upstream was contacted.
    #[error("{0}")]
    InvalidRequest(String),

    /// Every candidate failed and the fallback policy is `error`.
    #[error("all {} upstream candidates failed", .0.len())]
    AllUpstreamsFailed(Vec<Attempt>),

    /// Anything else caught at the request boundary.
    #[error("{0}")]
    Unhandled(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::AllUpstreamsFailed(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Unhandled(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ProxyError::InvalidRequest(detail) => json!({
                "error": "Invalid request",
                "detail": detail,
            }),
            ProxyError::AllUpstreamsFailed(tries) => json!({
                "error": "Upstream fetch failed",
                "detail": self.to_string(),
                "tries": tries,
            }),
            ProxyError::Unhandled(detail) => json!({
                "error": "Unhandled",
                "detail": detail,
            }),
        };
        (status, Json(body)).into_response()
    }
}
