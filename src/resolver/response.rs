//! Response building.
//!
//! Rows from every upstream pass through the same filter and truncation
//! here, so REST, Socrata and CSV results are indistinguishable to callers.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::dataset::CanonicalRow;
use crate::resolver::error::Attempt;
use crate::resolver::request::RequestDescriptor;

pub const X_UPSTREAM_SOURCE: &str = "x-upstream-source";

/// Final rows for one request, plus what is needed to render them.
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub rows: Vec<CanonicalRow>,
    /// Set on degraded paths; the body becomes `{note, data, tries}`.
    pub note: Option<String>,
    pub tries: Vec<Attempt>,
    /// `rest`, `socrata`, `csv` or `sample`.
    pub source: Option<&'static str>,
}

impl ProxyResponse {
    /// Filter and truncate rows served by `source`. Offset was already
    /// applied upstream.
    pub fn build(rows: Vec<CanonicalRow>, descriptor: &RequestDescriptor, source: &'static str) -> Self {
        let mut rows = descriptor.row_filter().apply(rows);
        rows.truncate(descriptor.size as usize);
        Self {
            status: StatusCode::OK,
            rows,
            note: None,
            tries: Vec::new(),
            source: Some(source),
        }
    }

    /// Every candidate failed or came back empty, and at least one was empty.
    pub fn empty(tries: Vec<Attempt>) -> Self {
        Self {
            status: StatusCode::OK,
            rows: Vec::new(),
            note: None,
            tries,
            source: None,
        }
    }

    /// Built-in sample served after exhaustion.
    pub fn sample(mut rows: Vec<CanonicalRow>, descriptor: &RequestDescriptor, tries: Vec<Attempt>) -> Self {
        rows.truncate(descriptor.size as usize);
        Self {
            status: StatusCode::OK,
            rows,
            note: Some("Upstream unavailable; serving sample data".to_string()),
            tries,
            source: Some("sample"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl IntoResponse for ProxyResponse {
    fn into_response(self) -> Response {
        let mut response = match &self.note {
            Some(note) => (
                self.status,
                Json(json!({
                    "note": note,
                    "data": self.rows,
                    "tries": self.tries,
                })),
            )
                .into_response(),
            None => (self.status, Json(&self.rows)).into_response(),
        };

        let headers = response.headers_mut();
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("public, max-age=60"));
        if let Some(source) = self.source {
            headers.insert(X_UPSTREAM_SOURCE, HeaderValue::from_static(source));
        }
        response
    }
}
