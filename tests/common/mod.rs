//! Shared utilities for integration testing.
//!
//! `MockUpstream` stands in for every CMS host at once: REST templates,
//! Socrata and the metastore all point at it, and a routing closure decides
//! what each request path gets.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use rmh_proxy::config::ProxyConfig;
use rmh_proxy::{HttpServer, Shutdown};

pub const HOSPITALS: &str = "xubh-q36u";
pub const HCAHPS: &str = "dgck-syfz";

/// Path prefixes the proxy derives from `proxy_config`.
pub const REST_V1: &str = "/provider-data/api/v1/dataset/";
pub const REST_DATA_API: &str = "/data-api/v1/dataset/";
pub const SOCRATA: &str = "/resource/";
pub const METASTORE: &str = "/provider-data/api/1/metastore/";
pub const CSV: &str = "/files/";

/// A canned upstream reply.
#[derive(Clone)]
pub struct MockResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
    pub delay: Option<Duration>,
}

impl MockResponse {
    pub fn json(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            content_type: "application/json",
            body: body.into(),
            delay: None,
        }
    }

    pub fn csv(body: impl Into<String>) -> Self {
        Self {
            content_type: "text/csv",
            ..Self::json(body)
        }
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "text/plain",
            ..Self::json(body)
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// A programmable HTTP/1.1 upstream recording every request target.
///
/// `{mock}` in a reply body is replaced by the mock's own base URL.
pub struct MockUpstream {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockUpstream {
    /// Start a mock answering each request target with `route(target)`.
    pub async fn start<F>(route: F) -> Self
    where
        F: Fn(&str) -> MockResponse + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let route = Arc::new(route);
        let base: Arc<str> = format!("http://{}", addr).into();

        let seen = requests.clone();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let route = route.clone();
                let seen = seen.clone();
                let base = base.clone();
                tokio::spawn(async move {
                    let Some(target) = read_request_target(&mut socket).await else {
                        return;
                    };
                    seen.lock().unwrap().push(target.clone());

                    let reply = route(&target);
                    let body = reply.body.replace("{mock}", &base);
                    if let Some(delay) = reply.delay {
                        tokio::time::sleep(delay).await;
                    }
                    let response = format!(
                        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        reply.status,
                        reason(reply.status),
                        reply.content_type,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self { addr, requests }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Every request target seen so far, in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn hits(&self, prefix: &str) -> usize {
        self.requests().iter().filter(|t| t.starts_with(prefix)).count()
    }
}

/// Metastore document whose only distribution is a CSV file on the mock.
pub fn metastore_doc(file: &str) -> String {
    serde_json::json!({
        "distribution": [
            { "data": { "downloadURL": format!("{{mock}}{}{}", CSV, file), "mediaType": "text/csv" } }
        ]
    })
    .to_string()
}

async fn read_request_target(socket: &mut tokio::net::TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let head = String::from_utf8_lossy(&buf);
    let request_line = head.lines().next()?;
    request_line.split_whitespace().nth(1).map(str::to_string)
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// Config with every upstream pointed at `mock`.
pub fn proxy_config(mock: &MockUpstream) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    let base = mock.url();
    config.upstream.rest_templates = vec![
        format!("{}{}{{id}}/data", base, REST_V1),
        format!("{}{}{{id}}/data", base, REST_DATA_API),
    ];
    config.upstream.socrata_host = base.clone();
    config.upstream.metastore_base = format!("{}/provider-data/api/1", base);
    config.upstream.timeout_ms = 1_000;
    config.upstream.csv_timeout_ms = 2_000;
    config.observability.metrics_enabled = false;
    config
}

/// A proxy serving on an ephemeral port. Stops when dropped.
pub struct TestProxy {
    pub base: String,
    shutdown: Shutdown,
}

impl TestProxy {
    pub async fn spawn(config: ProxyConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let server = HttpServer::new(config).unwrap();
        let shutdown = Shutdown::new();
        let rx = shutdown.subscribe();
        tokio::spawn(async move {
            let _ = server.run(listener, rx).await;
        });
        Self { base, shutdown }
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        reqwest::get(format!("{}{}", self.base, path)).await.unwrap()
    }

    pub async fn get_json(&self, path: &str) -> (u16, serde_json::Value) {
        let response = self.get(path).await;
        let status = response.status().as_u16();
        let body = response.json().await.unwrap();
        (status, body)
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}
