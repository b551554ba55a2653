//! Inbound query normalization.
//!
//! # Responsibilities
//! - Parse the raw query string into a `RequestDescriptor`
//! - Accept the historical aliases for each parameter
//! - Reject requests that cannot be served before any upstream call
//!
//! # Design Decisions
//! - Aliases have a fixed priority (`size` before `$limit`); query order does not matter
//! - Blank values are treated as absent and fall through to the next alias
//! - The descriptor is immutable once built

use url::form_urlencoded;

use crate::config::ProxyConfig;
use crate::dataset::{DatasetKind, LineFilter, RowFilter};
use crate::resolver::error::ProxyError;

const DATASET: &[&str] = &["dataset"];
const SIZE: &[&str] = &["size", "$limit"];
const OFFSET: &[&str] = &["offset", "$offset"];
const QUERY: &[&str] = &["q", "$q"];
const STATE: &[&str] = &["state"];
const PROVIDER_ID: &[&str] = &["provider_id", "facility_id", "ccn"];
const MODE: &[&str] = &["mode"];

/// Which candidates to try.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpstreamMode {
    /// REST templates, then Socrata, then CSV.
    #[default]
    Auto,
    /// Socrata only.
    Socrata,
}

/// One normalized proxy request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub dataset: String,
    pub kind: DatasetKind,
    pub size: u32,
    pub offset: u64,
    pub query: Option<String>,
    pub state: Option<String>,
    pub provider_id: Option<String>,
    pub mode: UpstreamMode,
}

impl RequestDescriptor {
    /// Build a descriptor from a raw (still percent-encoded) query string.
    pub fn from_query(raw: &str, config: &ProxyConfig) -> Result<Self, ProxyError> {
        let params: Vec<(String, String)> = form_urlencoded::parse(raw.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        // Aliases are tried in priority order; each contributes its first
        // occurrence, and a blank value falls through to the next alias.
        let first = |names: &[&str]| -> Option<String> {
            names.iter().find_map(|name| {
                params
                    .iter()
                    .find(|(k, _)| k == name)
                    .map(|(_, v)| v.trim().to_string())
                    .filter(|v| !v.is_empty())
            })
        };

        let dataset = first(DATASET)
            .ok_or_else(|| ProxyError::InvalidRequest("Missing ?dataset=".into()))?
            .to_ascii_lowercase();
        if !dataset
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        {
            return Err(ProxyError::InvalidRequest(format!(
                "malformed dataset id: {dataset}"
            )));
        }

        let kind = DatasetKind::classify(&dataset, &config.datasets);
        let provider_id = first(PROVIDER_ID);
        if kind.is_hcahps() && provider_id.is_none() {
            return Err(ProxyError::InvalidRequest(
                "HCAHPS requires one of ?provider_id= | ?facility_id= | ?ccn=".into(),
            ));
        }

        let limits = &config.limits;
        let size = first(SIZE)
            .and_then(|v| v.parse::<i64>().ok())
            .map(|n| n.clamp(1, i64::from(limits.max_page_size)) as u32)
            .unwrap_or(limits.default_page_size);
        let offset = first(OFFSET)
            .and_then(|v| v.parse::<i64>().ok())
            .map(|n| n.max(0) as u64)
            .unwrap_or(0);

        let mode = match first(MODE) {
            Some(mode) if mode.eq_ignore_ascii_case("socrata") => UpstreamMode::Socrata,
            _ => UpstreamMode::Auto,
        };

        Ok(Self {
            dataset,
            kind,
            size,
            offset,
            query: first(QUERY),
            state: first(STATE),
            provider_id,
            mode,
        })
    }

    /// Free-text query sent upstream. HCAHPS lookups are keyed by provider only.
    pub fn search_query(&self) -> Option<&str> {
        match self.kind {
            DatasetKind::Hcahps => None,
            _ => self.query.as_deref(),
        }
    }

    /// State filter sent upstream. HCAHPS lookups are keyed by provider only.
    pub fn search_state(&self) -> Option<&str> {
        match self.kind {
            DatasetKind::Hcahps => None,
            _ => self.state.as_deref(),
        }
    }

    /// Post-fetch predicate applied to every candidate's rows.
    pub fn row_filter(&self) -> RowFilter {
        match (self.kind, self.provider_id.as_deref()) {
            (DatasetKind::Hcahps, Some(id)) => RowFilter::provider(id),
            _ => RowFilter::search(self.search_query(), self.search_state()),
        }
    }

    /// Raw-line prefilter for the CSV stream; never stricter than `row_filter`.
    pub fn line_filter(&self) -> LineFilter {
        match (self.kind, self.provider_id.as_deref()) {
            (DatasetKind::Hcahps, Some(id)) => LineFilter::provider(id),
            _ => LineFilter::search(self.search_query(), self.search_state()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Result<RequestDescriptor, ProxyError> {
        RequestDescriptor::from_query(raw, &ProxyConfig::default())
    }

    #[test]
    fn test_defaults() {
        let d = parse("dataset=xubh-q36u").unwrap();
        assert_eq!(d.size, 24);
        assert_eq!(d.offset, 0);
        assert_eq!(d.kind, DatasetKind::Hospitals);
        assert_eq!(d.query, None);
        assert_eq!(d.mode, UpstreamMode::Auto);
    }

    #[test]
    fn test_missing_or_blank_dataset_is_rejected() {
        assert!(matches!(parse(""), Err(ProxyError::InvalidRequest(_))));
        assert!(matches!(parse("q=mercy"), Err(ProxyError::InvalidRequest(_))));
        assert!(matches!(parse("dataset=%20%20"), Err(ProxyError::InvalidRequest(_))));
    }

    #[test]
    fn test_malformed_dataset_is_rejected() {
        assert!(matches!(parse("dataset=../etc"), Err(ProxyError::InvalidRequest(_))));
        assert!(matches!(parse("dataset=a%2Fb"), Err(ProxyError::InvalidRequest(_))));
        assert_eq!(parse("dataset=XUBH-Q36U").unwrap().dataset, "xubh-q36u");
    }

    #[test]
    fn test_alias_priority_ignores_query_order() {
        let d = parse("dataset=abcd-1234&$limit=5&size=9&$offset=10&$q=mercy%20general&q=other&size=7").unwrap();
        assert_eq!(d.size, 9);
        assert_eq!(d.offset, 10);
        assert_eq!(d.query.as_deref(), Some("other"));
        assert_eq!(d.kind, DatasetKind::Generic);
    }

    #[test]
    fn test_blank_alias_falls_through() {
        assert_eq!(parse("dataset=a&size=&$limit=5").unwrap().size, 5);
        assert_eq!(parse("dataset=a&q=%20&$q=mercy").unwrap().query.as_deref(), Some("mercy"));

        let d = parse("dataset=dgck-syfz&provider_id=&ccn=010001").unwrap();
        assert_eq!(d.provider_id.as_deref(), Some("010001"));
        let d = parse("dataset=dgck-syfz&ccn=1&facility_id=2").unwrap();
        assert_eq!(d.provider_id.as_deref(), Some("2"));
    }

    #[test]
    fn test_size_and_offset_clamping() {
        assert_eq!(parse("dataset=a&size=0").unwrap().size, 1);
        assert_eq!(parse("dataset=a&size=100000").unwrap().size, 500);
        assert_eq!(parse("dataset=a&size=lots").unwrap().size, 24);
        assert_eq!(parse("dataset=a&offset=-3").unwrap().offset, 0);
        assert_eq!(parse("dataset=a&offset=x").unwrap().offset, 0);
    }

    #[test]
    fn test_hcahps_requires_provider() {
        assert!(matches!(parse("dataset=dgck-syfz"), Err(ProxyError::InvalidRequest(_))));
        let d = parse("dataset=dgck-syfz&ccn=010001&q=ignored&state=IL").unwrap();
        assert_eq!(d.provider_id.as_deref(), Some("010001"));
        assert_eq!(d.search_query(), None);
        assert_eq!(d.search_state(), None);
        assert_eq!(d.row_filter(), RowFilter::provider("010001"));
    }

    #[test]
    fn test_mode_switch() {
        assert_eq!(parse("dataset=a&mode=SOCRATA").unwrap().mode, UpstreamMode::Socrata);
        assert_eq!(parse("dataset=a&mode=csv").unwrap().mode, UpstreamMode::Auto);
    }
}
