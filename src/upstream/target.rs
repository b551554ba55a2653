//! Upstream candidate construction.
//!
//! # Responsibilities
//! - Turn a request descriptor into an ordered list of upstream targets
//! - Build Socrata SoQL parameters, including the HCAHPS provider clause
//! - Attach the app token to Socrata targets only
//!
//! # Design Decisions
//! - Order is the fallback policy: REST templates, then Socrata, then CSV
//! - Targets are plain data; nothing here performs I/O

use std::collections::BTreeMap;

use serde::Serialize;
use url::Url;

use crate::config::UpstreamConfig;
use crate::dataset::DatasetKind;
use crate::resolver::request::{RequestDescriptor, UpstreamMode};
use crate::upstream::client::UpstreamRequest;

/// Columns that may carry the CMS certification number in HCAHPS data.
const PROVIDER_COLUMNS: &[&str] = &["provider_id", "facility_id", "ccn"];

const HOSPITAL_SELECT: &[&str] = &[
    "facility_id as provider_id",
    "facility_name as hospital_name",
    "address",
    "city",
    "state",
    "zip_code",
    "phone_number",
    "hospital_type",
    "hospital_ownership",
    "emergency_services",
    "meets_criteria_for_birthing_friendly_designation as birthing_friendly",
    "hospital_overall_rating",
];

const HCAHPS_SELECT: &[&str] = &[
    "provider_id",
    "hcahps_measure_id",
    "hcahps_question",
    "hcahps_answer_description",
    "patient_survey_star_rating",
    "hcahps_linear_mean_value",
    "hcahps_answer_percent",
    "number_of_completed_surveys",
    "survey_response_rate_percent",
];

/// Kind of upstream a target talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UpstreamKind {
    #[serde(rename = "rest")]
    RestApi,
    #[serde(rename = "socrata")]
    Socrata,
    #[serde(rename = "csv")]
    CsvDownload,
}

impl UpstreamKind {
    pub fn as_str(self) -> &'static str {
        match self {
            UpstreamKind::RestApi => "rest",
            UpstreamKind::Socrata => "socrata",
            UpstreamKind::CsvDownload => "csv",
        }
    }
}

impl std::fmt::Display for UpstreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One upstream to try. For `CsvDownload` the URL is the metastore entry
/// from which the download URL is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamTarget {
    pub kind: UpstreamKind,
    pub url: String,
    pub headers: BTreeMap<String, String>,
}

impl UpstreamTarget {
    fn new(kind: UpstreamKind, url: Url) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("accept".to_string(), "application/json".to_string());
        Self {
            kind,
            url: url.into(),
            headers,
        }
    }

    pub fn request(&self) -> UpstreamRequest {
        self.headers
            .iter()
            .fold(UpstreamRequest::get(&self.url), |req, (k, v)| req.with_header(k, v))
    }
}

/// Builds candidate lists from upstream configuration.
pub struct CandidateBuilder<'a> {
    upstream: &'a UpstreamConfig,
}

impl<'a> CandidateBuilder<'a> {
    pub fn new(upstream: &'a UpstreamConfig) -> Self {
        Self { upstream }
    }

    /// Ordered candidates for a request.
    pub fn build(&self, descriptor: &RequestDescriptor) -> Result<Vec<UpstreamTarget>, url::ParseError> {
        if descriptor.mode == UpstreamMode::Socrata {
            return Ok(vec![self.socrata(descriptor)?]);
        }

        let mut targets = Vec::with_capacity(self.upstream.rest_templates.len() + 2);
        for template in &self.upstream.rest_templates {
            targets.push(self.rest(template, descriptor)?);
        }
        targets.push(self.socrata(descriptor)?);
        targets.push(self.metastore(&descriptor.dataset)?);
        Ok(targets)
    }

    fn rest(&self, template: &str, descriptor: &RequestDescriptor) -> Result<UpstreamTarget, url::ParseError> {
        let mut url = Url::parse(&template.replace("{id}", &descriptor.dataset))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("size", &descriptor.size.to_string());
            query.append_pair("offset", &descriptor.offset.to_string());
            if let Some(q) = descriptor.search_query() {
                query.append_pair("keyword", q);
            }
        }
        Ok(UpstreamTarget::new(UpstreamKind::RestApi, url))
    }

    fn socrata(&self, descriptor: &RequestDescriptor) -> Result<UpstreamTarget, url::ParseError> {
        let mut url = self.resource_url(&descriptor.dataset)?;
        {
            let mut query = url.query_pairs_mut();
            match descriptor.kind {
                DatasetKind::Hcahps => {
                    query.append_pair("$select", &HCAHPS_SELECT.join(","));
                    if let Some(id) = descriptor.provider_id.as_deref() {
                        query.append_pair("$where", &provider_where_clause(id));
                    }
                    query.append_pair("$order", "hcahps_measure_id");
                }
                DatasetKind::Hospitals => {
                    query.append_pair("$select", &HOSPITAL_SELECT.join(", "));
                    if self.upstream.app_token.is_some() {
                        query.append_pair("$order", "hospital_name");
                    }
                }
                DatasetKind::Generic => {}
            }
            query.append_pair("$limit", &descriptor.size.to_string());
            query.append_pair("$offset", &descriptor.offset.to_string());
            if let Some(q) = descriptor.search_query() {
                query.append_pair("$q", q);
            }
            if let Some(state) = descriptor.search_state() {
                query.append_pair("state", state);
            }
        }
        Ok(self.with_token(UpstreamTarget::new(UpstreamKind::Socrata, url)))
    }

    /// Metastore entry for a dataset; the CSV fetcher resolves the download from it.
    pub fn metastore(&self, dataset: &str) -> Result<UpstreamTarget, url::ParseError> {
        let base = self.upstream.metastore_base.trim_end_matches('/');
        let mut url = Url::parse(&format!("{}/metastore/schemas/dataset/items/{}", base, dataset))?;
        url.query_pairs_mut().append_pair("show-reference-ids", "false");
        Ok(UpstreamTarget::new(UpstreamKind::CsvDownload, url))
    }

    /// Single hospital by facility id, for the photo endpoint.
    pub fn hospital_lookup(&self, dataset: &str, provider_id: &str) -> Result<UpstreamTarget, url::ParseError> {
        let mut url = self.resource_url(dataset)?;
        url.query_pairs_mut()
            .append_pair("$select", &HOSPITAL_SELECT.join(", "))
            .append_pair("facility_id", provider_id.trim())
            .append_pair("$limit", "1");
        Ok(self.with_token(UpstreamTarget::new(UpstreamKind::Socrata, url)))
    }

    fn resource_url(&self, dataset: &str) -> Result<Url, url::ParseError> {
        let host = self.upstream.socrata_host.trim_end_matches('/');
        Url::parse(&format!("{}/resource/{}.json", host, dataset))
    }

    fn with_token(&self, mut target: UpstreamTarget) -> UpstreamTarget {
        if let Some(token) = &self.upstream.app_token {
            target.headers.insert("x-app-token".to_string(), token.clone());
        }
        target
    }
}

/// SoQL `$where` matching a provider id against every id column.
///
/// Upstream data stores the id as text or number, with or without zero
/// padding, so the clause ORs case-insensitive equality, prefix match and,
/// for numeric ids, numeric equality.
pub fn provider_where_clause(provider_id: &str) -> String {
    let id = provider_id.trim();
    let quoted = id.replace('\'', "''");

    let mut clauses: Vec<String> = PROVIDER_COLUMNS
        .iter()
        .map(|column| format!("upper({column})=upper('{quoted}')"))
        .collect();
    clauses.extend(
        PROVIDER_COLUMNS
            .iter()
            .map(|column| format!("starts_with({column},'{quoted}')")),
    );
    if let Ok(n) = id.parse::<u64>() {
        clauses.push(format!("provider_id={n}"));
    }
    clauses.join(" OR ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProxyConfig;

    fn descriptor(query: &str) -> RequestDescriptor {
        RequestDescriptor::from_query(query, &ProxyConfig::default()).unwrap()
    }

    fn params(target: &UpstreamTarget) -> Vec<(String, String)> {
        Url::parse(&target.url)
            .unwrap()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    fn param<'p>(pairs: &'p [(String, String)], name: &str) -> Option<&'p str> {
        pairs.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_candidate_order() {
        let config = UpstreamConfig::default();
        let targets = CandidateBuilder::new(&config)
            .build(&descriptor("dataset=xubh-q36u"))
            .unwrap();

        let kinds: Vec<_> = targets.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                UpstreamKind::RestApi,
                UpstreamKind::RestApi,
                UpstreamKind::Socrata,
                UpstreamKind::CsvDownload
            ]
        );
        assert!(targets[0].url.starts_with("https://data.cms.gov/provider-data/api/v1/dataset/xubh-q36u/data?"));
        assert!(targets[3].url.ends_with("/metastore/schemas/dataset/items/xubh-q36u?show-reference-ids=false"));
    }

    #[test]
    fn test_socrata_mode_only_tries_socrata() {
        let config = UpstreamConfig::default();
        let targets = CandidateBuilder::new(&config)
            .build(&descriptor("dataset=abcd-1234&mode=socrata"))
            .unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].kind, UpstreamKind::Socrata);
    }

    #[test]
    fn test_parameter_mapping() {
        let config = UpstreamConfig::default();
        let targets = CandidateBuilder::new(&config)
            .build(&descriptor("dataset=xubh-q36u&size=10&offset=20&q=mercy&state=IL"))
            .unwrap();

        let rest = params(&targets[0]);
        assert_eq!(param(&rest, "size"), Some("10"));
        assert_eq!(param(&rest, "offset"), Some("20"));
        assert_eq!(param(&rest, "keyword"), Some("mercy"));

        let soda = params(&targets[2]);
        assert_eq!(param(&soda, "$limit"), Some("10"));
        assert_eq!(param(&soda, "$offset"), Some("20"));
        assert_eq!(param(&soda, "$q"), Some("mercy"));
        assert_eq!(param(&soda, "state"), Some("IL"));
        assert_eq!(param(&soda, "$order"), None);
    }

    #[test]
    fn test_token_only_on_socrata() {
        let config = UpstreamConfig {
            app_token: Some("secret".into()),
            ..UpstreamConfig::default()
        };
        let targets = CandidateBuilder::new(&config)
            .build(&descriptor("dataset=xubh-q36u"))
            .unwrap();

        for target in &targets {
            let has_token = target.headers.contains_key("x-app-token");
            assert_eq!(has_token, target.kind == UpstreamKind::Socrata, "{:?}", target.kind);
        }
        assert_eq!(param(&params(&targets[2]), "$order"), Some("hospital_name"));
    }

    #[test]
    fn test_hcahps_where_clause() {
        let config = UpstreamConfig::default();
        let targets = CandidateBuilder::new(&config)
            .build(&descriptor("dataset=dgck-syfz&provider_id=010001"))
            .unwrap();
        let soda = params(&targets[2]);
        let clause = param(&soda, "$where").unwrap();

        assert!(clause.contains("upper(provider_id)=upper('010001')"));
        assert!(clause.contains("upper(ccn)=upper('010001')"));
        assert!(clause.contains("starts_with(facility_id,'010001')"));
        assert!(clause.ends_with(" OR provider_id=10001"));
        assert_eq!(param(&soda, "$order"), Some("hcahps_measure_id"));
    }

    #[test]
    fn test_where_clause_escapes_and_skips_numeric_for_text_ids() {
        let clause = provider_where_clause("AB'1");
        assert!(clause.contains("upper(provider_id)=upper('AB''1')"));
        assert!(!clause.contains("provider_id=AB"));
        assert_eq!(clause.matches(" OR ").count(), 5);
    }

    #[test]
    fn test_hospital_lookup() {
        let config = UpstreamConfig::default();
        let target = CandidateBuilder::new(&config)
            .hospital_lookup("xubh-q36u", " 010001 ")
            .unwrap();
        let pairs = params(&target);
        assert_eq!(param(&pairs, "facility_id"), Some("010001"));
        assert_eq!(param(&pairs, "$limit"), Some("1"));
    }
}
