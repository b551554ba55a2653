//! Dataset resolution subsystem.
//!
//! # Data Flow
//! ```text
//! raw query
//!     → request.rs (RequestDescriptor or InvalidRequest)
//!     → upstream::target (ordered candidates)
//!     → fetch each candidate in order, under its deadline
//!         ok + rows      → normalize → response.rs (filter, truncate) → done
//!         ok + no rows   → soft miss, next candidate
//!         error          → record attempt, next candidate
//!     → exhausted: [] if any candidate was empty, else sample or 502
//! ```
//!
//! # Design Decisions
//! - Candidates are tried strictly in sequence; the first non-empty result wins
//! - One attempt per candidate, no retries
//! - An earlier candidate's failure never reaches the caller when a later one succeeds

pub mod error;
pub mod request;
pub mod response;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use url::Url;

use crate::config::{FallbackPolicy, ProxyConfig};
use crate::dataset::sample::sample_rows;
use crate::dataset::{normalize, CanonicalRow, DatasetKind, HospitalRow, LineFilter, RawRow, RowFilter};
use crate::observability::metrics;
use crate::resilience::with_deadline;
use crate::upstream::csv::{fetch_csv_rows, CsvPlan};
use crate::upstream::json::fetch_json_rows;
use crate::upstream::metastore::{Distribution, MetadataResolver};
use crate::upstream::{CandidateBuilder, FetchError, UpstreamClient, UpstreamKind, UpstreamTarget};

pub use error::{Attempt, ProxyError};
pub use request::{RequestDescriptor, UpstreamMode};
pub use response::ProxyResponse;

/// Rows shown by `/hcahps-sample`.
const HCAHPS_SAMPLE_ROWS: usize = 5;

/// First HCAHPS CSV rows, for checking which provider ids exist.
#[derive(Debug, Clone, Serialize)]
pub struct HcahpsSample {
    pub provider_ids: Vec<String>,
    pub sample: Vec<CanonicalRow>,
    pub source: &'static str,
}

/// Resolves requests against the configured upstreams.
pub struct Resolver {
    client: Arc<dyn UpstreamClient>,
    config: Arc<ProxyConfig>,
    metadata: MetadataResolver,
}

impl Resolver {
    pub fn new(client: Arc<dyn UpstreamClient>, config: Arc<ProxyConfig>) -> Self {
        let metadata = MetadataResolver::new(config.upstream.metadata_cache_ttl_secs);
        Self {
            client,
            config,
            metadata,
        }
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    pub fn client(&self) -> &dyn UpstreamClient {
        self.client.as_ref()
    }

    /// Try each candidate until one yields rows.
    pub async fn resolve(&self, descriptor: &RequestDescriptor) -> Result<ProxyResponse, ProxyError> {
        let targets = CandidateBuilder::new(&self.config.upstream)
            .build(descriptor)
            .map_err(|e| ProxyError::Unhandled(format!("invalid upstream URL: {}", e)))?;

        let mut tries = Vec::new();
        let mut saw_empty = false;

        for target in &targets {
            let start = Instant::now();
            match self.fetch_target(target, descriptor).await {
                Ok(raw) => {
                    let fetched = raw.len();
                    let rows = raw.iter().map(|row| normalize(row, descriptor.kind)).collect();
                    let response = ProxyResponse::build(rows, descriptor, target.kind.as_str());
                    if response.is_empty() {
                        tracing::debug!(
                            upstream = %target.kind,
                            url = %target.url,
                            fetched,
                            "Upstream returned no matching rows, trying next"
                        );
                        metrics::record_upstream_attempt(target.kind.as_str(), "empty", start);
                        saw_empty = true;
                        continue;
                    }

                    tracing::info!(
                        upstream = %target.kind,
                        url = %target.url,
                        rows = response.rows.len(),
                        failed_before = tries.len(),
                        "Upstream served request"
                    );
                    metrics::record_upstream_attempt(target.kind.as_str(), "ok", start);
                    return Ok(response);
                }
                Err(err) => {
                    tracing::warn!(
                        upstream = %target.kind,
                        url = %target.url,
                        status = ?err.status(),
                        error = %err,
                        "Upstream candidate failed"
                    );
                    metrics::record_upstream_attempt(target.kind.as_str(), err.kind(), start);
                    tries.push(Attempt::new(target.kind, target.url.clone(), &err));
                }
            }
        }

        if saw_empty {
            return Ok(ProxyResponse::empty(tries));
        }
        self.exhausted(descriptor, tries)
    }

    fn exhausted(&self, descriptor: &RequestDescriptor, tries: Vec<Attempt>) -> Result<ProxyResponse, ProxyError> {
        let policy = self.config.fallback.policy;
        metrics::record_fallback(policy.as_str());
        match policy {
            FallbackPolicy::Sample => {
                tracing::warn!(
                    dataset = %descriptor.dataset,
                    attempts = tries.len(),
                    "All upstreams failed, serving sample data"
                );
                let rows = sample_rows(descriptor.kind, descriptor.provider_id.as_deref());
                Ok(ProxyResponse::sample(rows, descriptor, tries))
            }
            FallbackPolicy::Error => {
                tracing::error!(
                    dataset = %descriptor.dataset,
                    attempts = tries.len(),
                    "All upstreams failed"
                );
                Err(ProxyError::AllUpstreamsFailed(tries))
            }
        }
    }

    async fn fetch_target(&self, target: &UpstreamTarget, descriptor: &RequestDescriptor) -> Result<Vec<RawRow>, FetchError> {
        let upstream = &self.config.upstream;
        match target.kind {
            UpstreamKind::RestApi | UpstreamKind::Socrata => {
                with_deadline(
                    upstream.timeout_ms,
                    fetch_json_rows(self.client.as_ref(), target, upstream.snippet_chars),
                )
                .await
            }
            UpstreamKind::CsvDownload => {
                let plan = CsvPlan {
                    kind: descriptor.kind,
                    size: descriptor.size as usize,
                    offset: descriptor.offset,
                    line_filter: descriptor.line_filter(),
                    row_filter: descriptor.row_filter(),
                };
                with_deadline(
                    upstream.csv_timeout_ms,
                    self.fetch_download(target, &descriptor.dataset, plan),
                )
                .await
            }
        }
    }

    /// Resolve the dataset's distribution from the metastore, then read it.
    async fn fetch_download(&self, target: &UpstreamTarget, dataset: &str, plan: CsvPlan) -> Result<Vec<RawRow>, FetchError> {
        let snippet_chars = self.config.upstream.snippet_chars;
        let distribution = self
            .metadata
            .resolve(self.client.as_ref(), dataset, target, snippet_chars)
            .await?;

        match distribution {
            Distribution::Csv(url) => {
                tracing::debug!(dataset, url = %url, "Streaming CSV distribution");
                let selection = fetch_csv_rows(self.client.as_ref(), &url, plan, snippet_chars).await?;
                tracing::debug!(dataset, rows = selection.rows.len(), outcome = ?selection.outcome, "CSV stream finished");
                Ok(selection.rows)
            }
            Distribution::Api(url) => {
                let mut api = Url::parse(&url).map_err(|e| FetchError::MetadataResolution(format!("{dataset}: {e}")))?;
                api.query_pairs_mut()
                    .append_pair("size", &plan.size.to_string())
                    .append_pair("offset", &plan.offset.to_string());
                let api_target = UpstreamTarget {
                    kind: UpstreamKind::RestApi,
                    url: api.into(),
                    headers: target.headers.clone(),
                };
                fetch_json_rows(self.client.as_ref(), &api_target, snippet_chars).await
            }
        }
    }

    /// Look up one hospital by provider id: Socrata first, CSV second.
    pub async fn find_hospital(&self, provider_id: &str) -> Option<HospitalRow> {
        let upstream = &self.config.upstream;
        let dataset = self.config.datasets.hospitals_id.as_str();
        let builder = CandidateBuilder::new(upstream);
        let filter = RowFilter::provider(provider_id);

        match builder.hospital_lookup(dataset, provider_id) {
            Ok(target) => {
                let fetched = with_deadline(
                    upstream.timeout_ms,
                    fetch_json_rows(self.client.as_ref(), &target, upstream.snippet_chars),
                )
                .await;
                match fetched {
                    Ok(rows) => {
                        if let Some(row) = first_match(&rows, &filter) {
                            return Some(row);
                        }
                    }
                    Err(err) => tracing::warn!(provider_id, error = %err, "Hospital lookup via Socrata failed"),
                }
            }
            Err(e) => tracing::warn!(provider_id, error = %e, "Invalid hospital lookup URL"),
        }

        let target = builder.metastore(dataset).ok()?;
        let plan = CsvPlan {
            kind: DatasetKind::Hospitals,
            size: 1,
            offset: 0,
            line_filter: LineFilter::provider(provider_id),
            row_filter: filter.clone(),
        };
        match with_deadline(upstream.csv_timeout_ms, self.fetch_download(&target, dataset, plan)).await {
            Ok(rows) => first_match(&rows, &filter),
            Err(err) => {
                tracing::warn!(provider_id, error = %err, "Hospital lookup via CSV failed");
                None
            }
        }
    }

    /// First rows of the HCAHPS CSV, unfiltered.
    pub async fn hcahps_sample(&self) -> Result<HcahpsSample, FetchError> {
        let upstream = &self.config.upstream;
        let dataset = self.config.datasets.hcahps_id.as_str();
        let target = CandidateBuilder::new(upstream)
            .metastore(dataset)
            .map_err(|e| FetchError::MetadataResolution(format!("{dataset}: {e}")))?;
        let plan = CsvPlan {
            kind: DatasetKind::Hcahps,
            size: HCAHPS_SAMPLE_ROWS,
            offset: 0,
            line_filter: LineFilter::accept_all(),
            row_filter: RowFilter::default(),
        };

        let raw = with_deadline(upstream.csv_timeout_ms, self.fetch_download(&target, dataset, plan)).await?;
        let sample: Vec<CanonicalRow> = raw.iter().map(|row| normalize(row, DatasetKind::Hcahps)).collect();
        let provider_ids = sample
            .iter()
            .filter_map(|row| row.provider_id().map(str::to_string))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        Ok(HcahpsSample {
            provider_ids,
            sample,
            source: UpstreamKind::CsvDownload.as_str(),
        })
    }
}

fn first_match(rows: &[RawRow], filter: &RowFilter) -> Option<HospitalRow> {
    rows.iter()
        .map(|row| normalize(row, DatasetKind::Hospitals))
        .find(|row| filter.matches(row))
        .and_then(CanonicalRow::into_hospital)
}
