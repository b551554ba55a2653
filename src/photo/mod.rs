//! Hospital photos.
//!
//! # Responsibilities
//! - Resolve a provider id to an address through the resolver
//! - Relay a Street View image when a Maps key is configured
//! - Redirect to a labelled placeholder otherwise
//!
//! # Design Decisions
//! - Every failure path ends in a placeholder redirect, never an error page
//! - Image bytes are streamed through without buffering

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use url::{form_urlencoded, Url};

use crate::config::PhotoConfig;
use crate::dataset::HospitalRow;
use crate::resilience::with_deadline;
use crate::resolver::Resolver;
use crate::upstream::{FetchError, UpstreamRequest};

pub const DEFAULT_WIDTH: u32 = 640;
pub const DEFAULT_HEIGHT: u32 = 360;
const MIN_SIDE: u32 = 64;
const MAX_SIDE: u32 = 1280;

/// Query parameters of `/hospital-photo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoParams {
    pub provider_id: Option<String>,
    pub width: u32,
    pub height: u32,
    pub force_placeholder: bool,
}

impl PhotoParams {
    pub fn from_query(raw: &str) -> Self {
        let mut params = Self {
            provider_id: None,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            force_placeholder: false,
        };
        for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
            let value = value.trim();
            match key.as_ref() {
                "provider_id" if params.provider_id.is_none() && !value.is_empty() => {
                    params.provider_id = Some(value.to_string());
                }
                "w" => params.width = side(value, DEFAULT_WIDTH),
                "h" => params.height = side(value, DEFAULT_HEIGHT),
                "placeholder" => {
                    params.force_placeholder = ["1", "true", "yes"]
                        .iter()
                        .any(|flag| value.eq_ignore_ascii_case(flag));
                }
                _ => {}
            }
        }
        params
    }
}

fn side(value: &str, default: u32) -> u32 {
    value
        .parse::<i64>()
        .map(|n| n.clamp(i64::from(MIN_SIDE), i64::from(MAX_SIDE)) as u32)
        .unwrap_or(default)
}

/// Placeholder image labelled with the hospital name and "city, state".
pub fn placeholder_url(config: &PhotoConfig, width: u32, height: u32, label: &str) -> String {
    let base = config.placeholder_base.trim_end_matches('/');
    let query: String = form_urlencoded::Serializer::new(String::new())
        .append_pair("text", label)
        .finish();
    format!("{base}/{width}x{height}?{query}")
}

pub fn hospital_label(row: &HospitalRow) -> String {
    let place = [row.city.as_deref(), row.state.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(", ");
    let name = row.hospital_name.as_deref().unwrap_or("Hospital");
    if place.is_empty() {
        name.to_string()
    } else {
        format!("{name}\n{place}")
    }
}

/// Street View static image request for an address.
pub fn streetview_url(config: &PhotoConfig, address: &str, width: u32, height: u32, key: &str) -> Result<String, url::ParseError> {
    let mut url = Url::parse(&config.streetview_base)?;
    url.query_pairs_mut()
        .append_pair("size", &format!("{width}x{height}"))
        .append_pair("location", address)
        .append_pair("fov", "90")
        .append_pair("source", "outdoor")
        .append_pair("key", key);
    Ok(url.into())
}

fn street_address(row: &HospitalRow) -> String {
    let field = |v: &Option<String>| v.clone().unwrap_or_default();
    format!(
        "{}, {}, {} {}",
        field(&row.address),
        field(&row.city),
        field(&row.state),
        field(&row.zip_code)
    )
}

/// Link to this service's photo endpoint for a provider.
pub fn photo_url(base: &str, provider_id: &str) -> String {
    let query: String = form_urlencoded::Serializer::new(String::new())
        .append_pair("provider_id", provider_id)
        .append_pair("w", &DEFAULT_WIDTH.to_string())
        .append_pair("h", &DEFAULT_HEIGHT.to_string())
        .finish();
    format!("{}/hospital-photo?{}", base.trim_end_matches('/'), query)
}

/// Serve `/hospital-photo`.
pub async fn serve_photo(resolver: &Resolver, params: PhotoParams) -> Response {
    let Some(provider_id) = params.provider_id.as_deref() else {
        return (StatusCode::BAD_REQUEST, "Missing ?provider_id=").into_response();
    };
    let config = &resolver.config().photo;

    let Some(row) = resolver.find_hospital(provider_id).await else {
        tracing::info!(provider_id, "Hospital not found for photo");
        let url = placeholder_url(config, params.width, params.height, "Hospital not found");
        return found(url);
    };
    let placeholder = placeholder_url(config, params.width, params.height, &hospital_label(&row));

    let key = match config.gmaps_api_key.as_deref() {
        Some(key) if !params.force_placeholder => key,
        _ => return found(placeholder),
    };

    let url = match streetview_url(config, &street_address(&row), params.width, params.height, key) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(error = %e, "Invalid Street View base URL");
            return found(placeholder);
        }
    };

    let timeout_ms = resolver.config().upstream.timeout_ms;
    let fetched = with_deadline(timeout_ms, async {
        resolver
            .client()
            .get(UpstreamRequest::get(url))
            .await
            .map_err(FetchError::from)
    })
    .await;

    match fetched {
        Ok(image) if image.is_success() && is_image(image.content_type.as_deref()) => {
            let content_type = image
                .content_type
                .as_deref()
                .and_then(|ct| HeaderValue::from_str(ct).ok())
                .unwrap_or(HeaderValue::from_static("image/jpeg"));
            (
                [
                    (header::CONTENT_TYPE, content_type),
                    (header::CACHE_CONTROL, HeaderValue::from_static("public, max-age=86400")),
                ],
                Body::from_stream(image.body),
            )
                .into_response()
        }
        Ok(image) => {
            tracing::warn!(provider_id, status = image.status, content_type = ?image.content_type, "Street View returned no image");
            found(placeholder)
        }
        Err(err) => {
            tracing::warn!(provider_id, error = %err, "Street View fetch failed");
            found(placeholder)
        }
    }
}

/// 302 to `location`.
fn found(location: String) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

fn is_image(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_clamp_and_flags() {
        let p = PhotoParams::from_query("provider_id=%20010001%20&w=5000&h=10&placeholder=YES");
        assert_eq!(p.provider_id.as_deref(), Some("010001"));
        assert_eq!((p.width, p.height), (1280, 64));
        assert!(p.force_placeholder);

        let p = PhotoParams::from_query("w=abc&placeholder=0");
        assert_eq!(p.provider_id, None);
        assert_eq!((p.width, p.height), (640, 360));
        assert!(!p.force_placeholder);
    }

    #[test]
    fn test_placeholder_label() {
        let row = HospitalRow {
            hospital_name: Some("Mercy".into()),
            city: Some("Peoria".into()),
            state: Some("IL".into()),
            ..Default::default()
        };
        assert_eq!(hospital_label(&row), "Mercy\nPeoria, IL");
        assert_eq!(hospital_label(&HospitalRow::default()), "Hospital");
        assert_eq!(
            placeholder_url(&PhotoConfig::default(), 640, 360, "Mercy\nPeoria, IL"),
            "https://placehold.co/640x360?text=Mercy%0APeoria%2C+IL"
        );
    }

    #[test]
    fn test_streetview_url() {
        let url = streetview_url(&PhotoConfig::default(), "1 Main St, Peoria, IL 61601", 640, 360, "k").unwrap();
        assert!(url.contains("size=640x360"));
        assert!(url.contains("location=1+Main+St%2C+Peoria%2C+IL+61601"));
        assert!(url.ends_with("key=k"));
    }

    #[test]
    fn test_photo_url() {
        assert_eq!(
            photo_url("http://localhost:8080/", "010001"),
            "http://localhost:8080/hospital-photo?provider_id=010001&w=640&h=360"
        );
    }

    #[test]
    fn test_is_image() {
        assert!(is_image(Some("image/jpeg")));
        assert!(!is_image(Some("text/html")));
        assert!(!is_image(None));
    }
}
