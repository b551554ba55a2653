//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the CMS dataset proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Timeout configuration for inbound requests.
    pub timeouts: TimeoutConfig,

    /// Upstream endpoints, credentials and deadlines.
    pub upstream: UpstreamConfig,

    /// Well-known dataset identifiers.
    pub datasets: DatasetConfig,

    /// Pagination limits.
    pub limits: LimitConfig,

    /// Behaviour when every upstream candidate fails.
    pub fallback: FallbackConfig,

    /// Hospital photo endpoint settings.
    pub photo: PhotoConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Externally visible base URL used when building `photo_url` links.
    /// Falls back to `http://<Host header>` when unset.
    pub public_url: Option<String>,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            public_url: None,
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Upstream API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// REST dataset API templates, tried in order. `{id}` is replaced by the dataset id.
    pub rest_templates: Vec<String>,

    /// Socrata SODA host (e.g. "https://data.medicare.gov").
    pub socrata_host: String,

    /// Provider Data Catalog API base serving the metastore.
    pub metastore_base: String,

    /// Socrata application token, sent as `X-App-Token` to the Socrata host only.
    pub app_token: Option<String>,

    /// Per-call deadline for JSON upstream calls, in milliseconds.
    pub timeout_ms: u64,

    /// Deadline for a whole CSV resolve + stream, in milliseconds.
    pub csv_timeout_ms: u64,

    /// TCP connect timeout for the shared client, in milliseconds.
    pub connect_timeout_ms: u64,

    /// TTL for cached CSV download URLs. 0 disables the cache.
    pub metadata_cache_ttl_secs: u64,

    /// Maximum characters of an upstream body kept for diagnostics.
    pub snippet_chars: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            rest_templates: vec![
                "https://data.cms.gov/provider-data/api/v1/dataset/{id}/data".to_string(),
                "https://data.cms.gov/data-api/v1/dataset/{id}/data".to_string(),
            ],
            socrata_host: "https://data.medicare.gov".to_string(),
            metastore_base: "https://data.cms.gov/provider-data/api/1".to_string(),
            app_token: None,
            timeout_ms: 3_500,
            csv_timeout_ms: 20_000,
            connect_timeout_ms: 2_000,
            metadata_cache_ttl_secs: 0,
            snippet_chars: 400,
        }
    }
}

/// Dataset identifiers that select a specialised schema.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Hospital General Information dataset.
    pub hospitals_id: String,

    /// HCAHPS patient survey dataset.
    pub hcahps_id: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            hospitals_id: "xubh-q36u".to_string(),
            hcahps_id: "dgck-syfz".to_string(),
        }
    }
}

/// Pagination limits applied by the request normalizer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitConfig {
    /// Page size used when the request does not specify one.
    pub default_page_size: u32,

    /// Upper bound for requested page sizes.
    pub max_page_size: u32,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            default_page_size: 24,
            max_page_size: 500,
        }
    }
}

/// What to answer when every upstream candidate failed.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FallbackPolicy {
    /// 502 with diagnostic detail.
    #[default]
    Error,
    /// 200 with the built-in sample rows and a `note`.
    Sample,
}

impl FallbackPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            FallbackPolicy::Error => "error",
            FallbackPolicy::Sample => "sample",
        }
    }
}

impl std::str::FromStr for FallbackPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(FallbackPolicy::Error),
            "sample" => Ok(FallbackPolicy::Sample),
            other => Err(format!("unknown fallback policy '{}'", other)),
        }
    }
}

/// Fallback configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FallbackConfig {
    pub policy: FallbackPolicy,
}

/// Hospital photo configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PhotoConfig {
    /// Google Maps key enabling Street View images.
    pub gmaps_api_key: Option<String>,

    /// Placeholder image service base.
    pub placeholder_base: String,

    /// Street View static image endpoint.
    pub streetview_base: String,
}

impl Default for PhotoConfig {
    fn default() -> Self {
        Self {
            gmaps_api_key: None,
            placeholder_base: "https://placehold.co".to_string(),
            streetview_base: "https://maps.googleapis.com/maps/api/streetview".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
