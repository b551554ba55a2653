//! JSON fetcher for the REST and Socrata candidates.
//!
//! The body is always read as text first so a non-JSON answer (an HTML
//! error page, a gateway banner) is reported with a snippet instead of a
//! bare parse error.

use serde_json::Value;

use crate::dataset::{JsonRow, RawRow};
use crate::upstream::client::{UpstreamClient, UpstreamRequest};
use crate::upstream::error::{snippet, FetchError};
use crate::upstream::target::{UpstreamKind, UpstreamTarget};

/// Envelope keys that wrap the row array in CMS responses.
const ENVELOPE_KEYS: &[&str] = &["items", "data", "results"];

/// GET a JSON candidate and return its rows, tagged by upstream kind.
pub async fn fetch_json_rows(
    client: &dyn UpstreamClient,
    target: &UpstreamTarget,
    snippet_chars: usize,
) -> Result<Vec<RawRow>, FetchError> {
    let value = fetch_json_value(client, target.request(), snippet_chars).await?;
    Ok(extract_rows(value)
        .into_iter()
        .map(|row| tag(target.kind, row))
        .collect())
}

/// GET any JSON document.
pub async fn fetch_json_value(
    client: &dyn UpstreamClient,
    request: UpstreamRequest,
    snippet_chars: usize,
) -> Result<Value, FetchError> {
    let response = client.get(request).await?;
    let status = response.status;
    let success = response.is_success();
    let text = response.text().await?;

    if !success {
        return Err(FetchError::Status {
            status,
            snippet: snippet(&text, snippet_chars),
        });
    }

    serde_json::from_str(&text).map_err(|_| FetchError::InvalidJson {
        status,
        snippet: snippet(&text, snippet_chars),
    })
}

/// Pull object rows out of a bare array or a known envelope. Anything
/// else yields no rows.
pub fn extract_rows(value: Value) -> Vec<JsonRow> {
    let array = match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => {
            let key = ENVELOPE_KEYS
                .iter()
                .find(|key| matches!(obj.get(**key), Some(Value::Array(_))));
            match key.and_then(|key| obj.remove(*key)) {
                Some(Value::Array(items)) => items,
                _ => return Vec::new(),
            }
        }
        _ => return Vec::new(),
    };

    array
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(obj) => Some(obj),
            _ => None,
        })
        .collect()
}

fn tag(kind: UpstreamKind, row: JsonRow) -> RawRow {
    match kind {
        UpstreamKind::Socrata => RawRow::Socrata(row),
        UpstreamKind::RestApi | UpstreamKind::CsvDownload => RawRow::Rest(row),
    }
}
