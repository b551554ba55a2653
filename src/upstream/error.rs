//! Per-candidate fetch failures.

use thiserror::Error;

use crate::upstream::client::TransportError;

/// Why a single upstream candidate produced no rows.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Non-2xx status.
    #[error("HTTP {status}: {snippet}")]
    Status { status: u16, snippet: String },

    /// 2xx status but the body was not JSON.
    #[error("invalid JSON (HTTP {status}): {snippet}")]
    InvalidJson { status: u16, snippet: String },

    /// Connection, TLS or protocol failure before a status was received.
    #[error("transport: {0}")]
    Transport(String),

    /// The per-call deadline expired; the in-flight call was dropped.
    #[error("timed out after {0} ms")]
    Timeout(u64),

    /// The catalog lists no CSV or API distribution for the dataset.
    #[error("no CSV distribution found for dataset {0}")]
    MetadataResolution(String),

    /// Reading the CSV body failed midway.
    #[error("CSV stream: {0}")]
    Stream(String),
}

impl FetchError {
    /// Short machine-readable kind, used for logs and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Status { .. } => "status",
            FetchError::InvalidJson { .. } => "invalid_json",
            FetchError::Transport(_) => "transport",
            FetchError::Timeout(_) => "timeout",
            FetchError::MetadataResolution(_) => "metadata",
            FetchError::Stream(_) => "stream",
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } | FetchError::InvalidJson { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<TransportError> for FetchError {
    fn from(err: TransportError) -> Self {
        FetchError::Transport(err.to_string())
    }
}

/// Keep at most `max_chars` characters of an upstream body.
pub fn snippet(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}
