//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (CORS, panic catching, request ID, tracing, timeout)
//! - Serve over plain TCP or rustls, with graceful shutdown

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::middleware;
use axum::routing::get;
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ProxyConfig;
use crate::http::handlers;
use crate::http::request::{RequestUuid, X_REQUEST_ID};
use crate::http::response::panic_response;
use crate::resolver::Resolver;
use crate::security::{preflight, with_cors};
use crate::upstream::{ReqwestUpstreamClient, UpstreamClient};

/// How long in-flight TLS connections may drain after shutdown.
const TLS_DRAIN: Duration = Duration::from_secs(10);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ProxyConfig>,
    pub resolver: Arc<Resolver>,
}

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a server talking to the real upstreams.
    pub fn new(config: ProxyConfig) -> Result<Self, reqwest::Error> {
        let connect_timeout = Duration::from_millis(config.upstream.connect_timeout_ms);
        let client = ReqwestUpstreamClient::new(connect_timeout)?;
        Ok(Self::with_client(config, Arc::new(client)))
    }

    /// Create a server with an injected upstream client.
    pub fn with_client(config: ProxyConfig, client: Arc<dyn UpstreamClient>) -> Self {
        let config = Arc::new(config);
        let state = AppState {
            resolver: Arc::new(Resolver::new(client, config.clone())),
            config: config.clone(),
        };
        let router = Self::build_router(&config, state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Layers are listed innermost first; CORS ends up outermost.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let router = Router::new()
            .route("/", get(handlers::root))
            .route("/ping", get(handlers::ping))
            .route("/diag", get(handlers::diag))
            .route("/cms-proxy", get(handlers::cms_proxy))
            .route("/.netlify/functions/cms-proxy", get(handlers::cms_proxy))
            .route("/hcahps-sample", get(handlers::hcahps_sample))
            .route("/hospital-photo", get(handlers::hospital_photo))
            .fallback(handlers::not_found)
            .with_state(state)
            .layer(middleware::from_fn(preflight))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, RequestUuid))
            .layer(CatchPanicLayer::custom(panic_response));
        with_cors(router)
    }

    /// The fully layered router, for in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve plain HTTP until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Serve HTTPS until `shutdown` fires.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        mut shutdown: broadcast::Receiver<()>,
    ) -> io::Result<()> {
        tracing::info!(address = %addr, "HTTPS server starting");

        let handle = axum_server::Handle::new();
        let drain = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!("Shutdown signal received");
            drain.graceful_shutdown(Some(TLS_DRAIN));
        });

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.router.into_make_service())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::client::{TransportError, UpstreamRequest, UpstreamResponse};
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use futures_util::future::BoxFuture;
    use tower::ServiceExt;

    /// Every upstream call fails at the transport level.
    struct Unreachable;

    impl UpstreamClient for Unreachable {
        fn get<'a>(
            &'a self,
            _request: UpstreamRequest,
        ) -> BoxFuture<'a, Result<UpstreamResponse, TransportError>> {
            Box::pin(async { Err(TransportError::new("connection refused")) })
        }
    }

    /// Panics on the first upstream call.
    struct Exploding;

    impl UpstreamClient for Exploding {
        fn get<'a>(
            &'a self,
            _request: UpstreamRequest,
        ) -> BoxFuture<'a, Result<UpstreamResponse, TransportError>> {
            panic!("upstream client exploded")
        }
    }

    /// Never answers.
    struct Stalled;

    impl UpstreamClient for Stalled {
        fn get<'a>(
            &'a self,
            _request: UpstreamRequest,
        ) -> BoxFuture<'a, Result<UpstreamResponse, TransportError>> {
            Box::pin(std::future::pending::<Result<UpstreamResponse, TransportError>>())
        }
    }

    fn router() -> Router {
        HttpServer::with_client(ProxyConfig::default(), Arc::new(Unreachable)).router()
    }

    async fn call_with(router: Router, method: Method, uri: &str) -> axum::response::Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        router.oneshot(request).await.unwrap()
    }

    async fn call(method: Method, uri: &str) -> axum::response::Response {
        call_with(router(), method, uri).await
    }

    fn assert_cors(response: &axum::response::Response) {
        let headers = response.headers();
        assert_eq!(headers["access-control-allow-origin"], "*");
        assert_eq!(headers["access-control-allow-methods"], "GET, OPTIONS");
        assert_eq!(
            headers["access-control-allow-headers"],
            "Content-Type, Authorization, X-App-Token"
        );
    }

    #[tokio::test]
    async fn test_preflight() {
        let response = call(Method::OPTIONS, "/cms-proxy?dataset=xubh-q36u").await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_cors(&response);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn test_cors_on_every_status() {
        for (uri, status) in [
            ("/", StatusCode::OK),
            ("/nope", StatusCode::NOT_FOUND),
            ("/cms-proxy", StatusCode::BAD_REQUEST),
            ("/cms-proxy?dataset=xubh-q36u", StatusCode::BAD_GATEWAY),
            ("/hospital-photo", StatusCode::BAD_REQUEST),
        ] {
            let response = call(Method::GET, uri).await;
            assert_eq!(response.status(), status, "{uri}");
            assert_cors(&response);
            assert!(response.headers().contains_key("x-request-id"), "{uri}");
        }
    }

    #[tokio::test]
    async fn test_panic_becomes_unhandled_with_cors() {
        let router = HttpServer::with_client(ProxyConfig::default(), Arc::new(Exploding)).router();
        let response = call_with(router, Method::GET, "/cms-proxy?dataset=xubh-q36u").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_cors(&response);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Unhandled");
        assert_eq!(body["detail"], "upstream client exploded");
    }

    #[tokio::test]
    async fn test_request_timeout_keeps_cors() {
        let mut config = ProxyConfig::default();
        config.timeouts.request_secs = 1;
        config.upstream.timeout_ms = 60_000;
        let router = HttpServer::with_client(config, Arc::new(Stalled)).router();

        let response = call_with(router, Method::GET, "/cms-proxy?dataset=xubh-q36u").await;
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        assert_cors(&response);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_netlify_alias() {
        let response = call(Method::GET, "/.netlify/functions/cms-proxy").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_diag() {
        let response = call(Method::GET, "/diag").await;
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["ok"], true);
        assert_eq!(body["has_app_token"], false);
        assert_eq!(body["fallback_policy"], "error");
    }

    #[tokio::test]
    async fn test_photo_without_hospital_redirects_to_placeholder() {
        let response = call(Method::GET, "/hospital-photo?provider_id=010001").await;
        assert_eq!(response.status(), StatusCode::FOUND);
        let location = response.headers()["location"].to_str().unwrap();
        assert!(location.starts_with("https://placehold.co/640x360?text=Hospital+not+found"));
    }
}
