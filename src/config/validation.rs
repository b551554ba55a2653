//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, page sizes ordered)
//! - Check that every upstream base is a usable absolute URL
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} is not a valid absolute URL: {value}")]
    BadUrl { field: &'static str, value: String },

    #[error("REST template '{0}' has no {{id}} placeholder")]
    MissingPlaceholder(String),

    #[error("default_page_size ({default}) must be between 1 and max_page_size ({max})")]
    PageSize { default: u32, max: u32 },

    #[error("hospitals_id and hcahps_id must differ")]
    DuplicateDataset,
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.trim().is_empty() {
        errors.push(ValidationError::Empty { field: "listener.bind_address" });
    }
    if let Some(public_url) = &config.listener.public_url {
        check_url(&mut errors, "listener.public_url", public_url);
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero { field: "timeouts.request_secs" });
    }

    let upstream = &config.upstream;
    for (field, value) in [
        ("upstream.timeout_ms", upstream.timeout_ms),
        ("upstream.csv_timeout_ms", upstream.csv_timeout_ms),
        ("upstream.connect_timeout_ms", upstream.connect_timeout_ms),
        ("upstream.snippet_chars", upstream.snippet_chars as u64),
    ] {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }

    for template in &upstream.rest_templates {
        if !template.contains("{id}") {
            errors.push(ValidationError::MissingPlaceholder(template.clone()));
        }
        check_url(&mut errors, "upstream.rest_templates", &template.replace("{id}", "probe"));
    }
    check_url(&mut errors, "upstream.socrata_host", &upstream.socrata_host);
    check_url(&mut errors, "upstream.metastore_base", &upstream.metastore_base);
    check_url(&mut errors, "photo.placeholder_base", &config.photo.placeholder_base);
    check_url(&mut errors, "photo.streetview_base", &config.photo.streetview_base);

    let limits = &config.limits;
    if limits.default_page_size == 0 || limits.default_page_size > limits.max_page_size {
        errors.push(ValidationError::PageSize {
            default: limits.default_page_size,
            max: limits.max_page_size,
        });
    }

    let datasets = &config.datasets;
    if datasets.hospitals_id.trim().is_empty() {
        errors.push(ValidationError::Empty { field: "datasets.hospitals_id" });
    }
    if datasets.hcahps_id.trim().is_empty() {
        errors.push(ValidationError::Empty { field: "datasets.hcahps_id" });
    }
    if datasets.hospitals_id.eq_ignore_ascii_case(&datasets.hcahps_id) {
        errors.push(ValidationError::DuplicateDataset);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    let ok = Url::parse(value)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false);
    if !ok {
        errors.push(ValidationError::BadUrl {
            field,
            value: value.to_string(),
        });
    }
}
