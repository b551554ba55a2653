//! Dataset metadata lookup.
//!
//! The provider-data catalog describes each dataset with a list of
//! distributions. The CSV fallback needs one downloadable CSV; when the
//! catalog only lists an API endpoint, that is used instead.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;

use crate::upstream::client::UpstreamClient;
use crate::upstream::error::FetchError;
use crate::upstream::json::fetch_json_value;
use crate::upstream::target::UpstreamTarget;

/// A resolved download location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Distribution {
    /// Downloadable CSV file.
    Csv(String),
    /// JSON API endpoint serving the same rows.
    Api(String),
}

impl Distribution {
    pub fn url(&self) -> &str {
        match self {
            Distribution::Csv(url) | Distribution::Api(url) => url,
        }
    }
}

/// Parsed catalog entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetMetadata {
    pub csv_urls: Vec<String>,
    pub api_urls: Vec<String>,
}

impl DatasetMetadata {
    /// Read `distribution[]` from a catalog document. Unknown shapes yield
    /// an empty entry.
    pub fn from_value(value: &Value) -> Self {
        let mut metadata = Self::default();
        let Some(distributions) = value.get("distribution").and_then(Value::as_array) else {
            return metadata;
        };

        let mut latest_api = Vec::new();
        for dist in distributions {
            if let Some(url) = csv_url(dist) {
                metadata.csv_urls.push(url.to_string());
                continue;
            }
            if let Some(url) = api_url(dist) {
                let latest = text(dist, &["description"])
                    .is_some_and(|d| d.eq_ignore_ascii_case("latest"));
                if latest {
                    latest_api.push(url.to_string());
                } else {
                    metadata.api_urls.push(url.to_string());
                }
            }
        }
        latest_api.append(&mut metadata.api_urls);
        metadata.api_urls = latest_api;
        metadata
    }

    /// First CSV, else the preferred API endpoint.
    pub fn distribution(&self) -> Option<Distribution> {
        self.csv_urls
            .first()
            .map(|url| Distribution::Csv(url.clone()))
            .or_else(|| self.api_urls.first().map(|url| Distribution::Api(url.clone())))
    }
}

// Tried in order; the first string ending in `.csv` wins.
const URL_PATHS: &[&[&str]] = &[
    &["data", "downloadURL"],
    &["downloadURL"],
    &["data", "accessURL"],
    &["accessURL"],
];

fn csv_url(dist: &Value) -> Option<&str> {
    URL_PATHS
        .iter()
        .filter_map(|path| text(dist, path))
        .find(|url| url.to_ascii_lowercase().ends_with(".csv"))
}

const FORMAT_PATHS: &[&[&str]] = &[&["format"], &["data", "format"]];

fn api_url(dist: &Value) -> Option<&str> {
    let is_api = FORMAT_PATHS
        .iter()
        .filter_map(|path| text(dist, path))
        .any(|format| format.eq_ignore_ascii_case("api"));
    if !is_api {
        return None;
    }
    text(dist, &["accessURL"]).or_else(|| text(dist, &["data", "accessURL"]))
}

fn text<'v>(value: &'v Value, path: &[&str]) -> Option<&'v str> {
    path.iter()
        .try_fold(value, |v, key| v.get(*key))
        .and_then(Value::as_str)
}

/// Resolves distributions, optionally caching successes for a TTL.
#[derive(Clone)]
pub struct MetadataResolver {
    ttl: Option<Duration>,
    cache: Arc<DashMap<String, (Instant, Distribution)>>,
}

impl MetadataResolver {
    /// A TTL of zero disables caching.
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            ttl: (ttl_secs > 0).then(|| Duration::from_secs(ttl_secs)),
            cache: Arc::new(DashMap::new()),
        }
    }

    pub fn cached(&self, dataset: &str) -> Option<Distribution> {
        let ttl = self.ttl?;
        let entry = self.cache.get(dataset)?;
        let (stored_at, distribution) = entry.value();
        if stored_at.elapsed() < ttl {
            return Some(distribution.clone());
        }
        let stale = *stored_at;
        drop(entry);
        self.evict(dataset, stale);
        None
    }

    /// Remove the entry stored at `stale`, leaving any newer one in place.
    fn evict(&self, dataset: &str, stale: Instant) {
        self.cache.remove_if(dataset, |_, (stored_at, _)| *stored_at == stale);
    }

    /// Look up the catalog entry behind `target` and pick a distribution.
    pub async fn resolve(
        &self,
        client: &dyn UpstreamClient,
        dataset: &str,
        target: &UpstreamTarget,
        snippet_chars: usize,
    ) -> Result<Distribution, FetchError> {
        if let Some(hit) = self.cached(dataset) {
            tracing::debug!(dataset, url = hit.url(), "metadata cache hit");
            return Ok(hit);
        }

        let value = fetch_json_value(client, target.request(), snippet_chars).await?;
        let distribution = DatasetMetadata::from_value(&value)
            .distribution()
            .ok_or_else(|| FetchError::MetadataResolution(dataset.to_string()))?;

        if self.ttl.is_some() {
            self.cache
                .insert(dataset.to_string(), (Instant::now(), distribution.clone()));
        }
        Ok(distribution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UpstreamConfig;
    use crate::upstream::client::{TransportError, UpstreamRequest, UpstreamResponse};
    use crate::upstream::target::CandidateBuilder;
    use futures_util::future::BoxFuture;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Catalog {
        body: String,
        calls: AtomicUsize,
    }

    impl UpstreamClient for Catalog {
        fn get<'a>(
            &'a self,
            _request: UpstreamRequest,
        ) -> BoxFuture<'a, Result<UpstreamResponse, TransportError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let response = UpstreamResponse::from_chunks(200, None, [self.body.clone()]);
            Box::pin(async move { Ok(response) })
        }
    }

    fn metastore_target() -> UpstreamTarget {
        CandidateBuilder::new(&UpstreamConfig::default())
            .metastore("dgck-syfz")
            .unwrap()
    }

    #[test]
    fn test_download_url_priority() {
        let meta = DatasetMetadata::from_value(&json!({
            "distribution": [
                {"data": {"accessURL": "https://example.test/a.CSV", "downloadURL": "https://example.test/b.json"}},
                {"downloadURL": "https://example.test/c.csv"}
            ]
        }));
        assert_eq!(
            meta.distribution(),
            Some(Distribution::Csv("https://example.test/a.CSV".into()))
        );
        assert_eq!(meta.csv_urls.len(), 2);
    }

    #[test]
    fn test_api_distribution_prefers_latest() {
        let meta = DatasetMetadata::from_value(&json!({
            "distribution": [
                {"format": "API", "accessURL": "https://example.test/api/v1/old", "description": "2019"},
                {"format": "api", "accessURL": "https://example.test/api/v1/latest", "description": "Latest"}
            ]
        }));
        assert_eq!(
            meta.distribution(),
            Some(Distribution::Api("https://example.test/api/v1/latest".into()))
        );
    }

    #[test]
    fn test_no_distribution() {
        assert_eq!(DatasetMetadata::from_value(&json!({"title": "x"})).distribution(), None);
        assert_eq!(
            DatasetMetadata::from_value(&json!({"distribution": [{"downloadURL": "https://example.test/x.zip"}]}))
                .distribution(),
            None
        );
    }

    #[test]
    fn test_eviction_keeps_a_newer_entry() {
        let resolver = MetadataResolver::new(1);
        let stale = Instant::now().checked_sub(Duration::from_secs(5)).unwrap();
        resolver.cache.insert(
            "dgck-syfz".into(),
            (stale, Distribution::Csv("https://example.test/old.csv".into())),
        );
        assert_eq!(resolver.cached("dgck-syfz"), None);
        assert!(resolver.cache.is_empty());

        let fresh = Distribution::Csv("https://example.test/new.csv".into());
        resolver.cache.insert("dgck-syfz".into(), (Instant::now(), fresh.clone()));
        resolver.evict("dgck-syfz", stale);
        assert_eq!(resolver.cached("dgck-syfz"), Some(fresh));
    }

    #[tokio::test]
    async fn test_missing_csv_is_metadata_error() {
        let client = Catalog { body: r#"{"distribution": []}"#.into(), calls: AtomicUsize::new(0) };
        let err = MetadataResolver::new(0)
            .resolve(&client, "dgck-syfz", &metastore_target(), 400)
            .await
            .unwrap_err();
        assert_eq!(err, FetchError::MetadataResolution("dgck-syfz".into()));
    }

    #[tokio::test]
    async fn test_cache_is_used_only_when_enabled() {
        let body = json!({"distribution": [{"downloadURL": "https://example.test/h.csv"}]}).to_string();

        let client = Catalog { body: body.clone(), calls: AtomicUsize::new(0) };
        let resolver = MetadataResolver::new(0);
        for _ in 0..2 {
            resolver.resolve(&client, "dgck-syfz", &metastore_target(), 400).await.unwrap();
        }
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);

        let client = Catalog { body, calls: AtomicUsize::new(0) };
        let resolver = MetadataResolver::new(300);
        for _ in 0..2 {
            resolver.resolve(&client, "dgck-syfz", &metastore_target(), 400).await.unwrap();
        }
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            resolver.cached("dgck-syfz"),
            Some(Distribution::Csv("https://example.test/h.csv".into()))
        );
    }
}
