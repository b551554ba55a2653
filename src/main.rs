//! Rate My Hospital data proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!   Browser ──▶ http (CORS, request id, trace, timeout)
//!                 │
//!                 ▼
//!              resolver ──▶ candidates, tried in order
//!                 │            ├─ REST dataset APIs (JSON)
//!                 │            ├─ Socrata SODA (JSON)
//!                 │            └─ metastore → CSV download (streamed)
//!                 ▼
//!              dataset (header keys, normalization, filter)
//!                 │
//!   Browser ◀──── JSON array  (or sample / 502 after exhaustion)
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use rmh_proxy::config::loader::load_runtime_config;
use rmh_proxy::net::load_tls_config;
use rmh_proxy::observability::{logging, metrics};
use rmh_proxy::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "rmh-proxy")]
#[command(about = "CMS / Medicare dataset proxy for Rate My Hospital", long_about = None)]
struct Args {
    /// Optional TOML config file; environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_runtime_config(args.config.as_deref())?;

    logging::init_tracing(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "rmh-proxy starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        fallback_policy = config.fallback.policy.as_str(),
        has_app_token = config.upstream.app_token.is_some(),
        upstream_timeout_ms = config.upstream.timeout_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    let tls = config.listener.tls.clone();
    let bind_address = config.listener.bind_address.clone();
    let server = HttpServer::new(config)?;

    match tls {
        Some(tls) => {
            let rustls = load_tls_config(&tls).await?;
            let addr: SocketAddr = bind_address.parse()?;
            server.run_tls(addr, rustls, shutdown.subscribe()).await?;
        }
        None => {
            let listener = TcpListener::bind(&bind_address).await?;
            server.run(listener, shutdown.subscribe()).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
