//! Outbound HTTP transport.
//!
//! # Responsibilities
//! - Define the `UpstreamClient` seam fetchers are written against
//! - Provide the production implementation on a single shared `reqwest::Client`
//! - Expose response bodies as chunk streams for incremental parsing

use std::collections::BTreeMap;
use std::pin::Pin;
use std::time::Duration;

use axum::body::Bytes;
use futures_util::future::BoxFuture;
use futures_util::stream::{self, Stream, StreamExt};
use thiserror::Error;

/// Response body as a stream of chunks.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// Transport-level failure (connect, TLS, read).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_connect() {
            Self::new(format!("connection failed: {}", err))
        } else if err.is_timeout() {
            Self::new(format!("request timeout: {}", err))
        } else {
            Self::new(format!("request failed: {}", err))
        }
    }
}

/// An outbound GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRequest {
    pub url: String,
    pub headers: BTreeMap<String, String>,
}

impl UpstreamRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: BTreeMap::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }
}

/// Status, content type and a streaming body.
pub struct UpstreamResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: BodyStream,
}

impl std::fmt::Debug for UpstreamResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamResponse")
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

impl UpstreamResponse {
    /// Build a response from in-memory chunks. Used by fakes and tests.
    pub fn from_chunks<I, C>(status: u16, content_type: Option<&str>, chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Bytes>,
    {
        let chunks: Vec<Result<Bytes, TransportError>> =
            chunks.into_iter().map(|c| Ok(c.into())).collect();
        Self {
            status,
            content_type: content_type.map(str::to_string),
            body: Box::pin(stream::iter(chunks)),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Drain the body into memory.
    pub async fn bytes(self) -> Result<Vec<u8>, TransportError> {
        let mut body = self.body;
        let mut out = Vec::new();
        while let Some(chunk) = body.next().await {
            out.extend_from_slice(&chunk?);
        }
        Ok(out)
    }

    /// Drain the body as text, replacing invalid UTF-8.
    pub async fn text(self) -> Result<String, TransportError> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Transport contract used by every fetcher.
pub trait UpstreamClient: Send + Sync {
    fn get<'a>(
        &'a self,
        request: UpstreamRequest,
    ) -> BoxFuture<'a, Result<UpstreamResponse, TransportError>>;
}

/// Production client backed by one shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestUpstreamClient {
    client: reqwest::Client,
}

impl ReqwestUpstreamClient {
    pub fn new(connect_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("rmh-proxy/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(connect_timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl UpstreamClient for ReqwestUpstreamClient {
    fn get<'a>(
        &'a self,
        request: UpstreamRequest,
    ) -> BoxFuture<'a, Result<UpstreamResponse, TransportError>> {
        Box::pin(async move {
            let mut builder = self.client.get(&request.url);
            for (name, value) in &request.headers {
                builder = builder.header(name, value);
            }

            let response = builder.send().await.map_err(TransportError::from_reqwest)?;
            let status = response.status().as_u16();
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            let body = stream::unfold(Some(response), |state| async move {
                let mut response = state?;
                match response.chunk().await {
                    Ok(Some(chunk)) => Some((Ok(chunk), Some(response))),
                    Ok(None) => None,
                    Err(e) => Some((Err(TransportError::from_reqwest(e)), None)),
                }
            });

            Ok(UpstreamResponse {
                status,
                content_type,
                body: Box::pin(body),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_names_are_lowercased() {
        let request = UpstreamRequest::get("https://example.test/resource/abcd-1234.json")
            .with_header("X-App-Token", "token-123");
        assert_eq!(
            request.headers.get("x-app-token").map(String::as_str),
            Some("token-123")
        );
    }

    #[tokio::test]
    async fn test_text_joins_chunks() {
        let response = UpstreamResponse::from_chunks(200, None, ["[{\"a\":", "1}]"]);
        assert!(response.is_success());
        assert_eq!(response.text().await.unwrap(), "[{\"a\":1}]");
    }
}
