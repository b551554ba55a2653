//! Route handlers.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use axum::extract::{RawQuery, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::dataset::{CanonicalRow, DatasetKind};
use crate::http::request::request_id;
use crate::http::response::text;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::photo::{photo_url, serve_photo, PhotoParams};
use crate::resolver::RequestDescriptor;
use crate::upstream::FetchError;

pub async fn root() -> Response {
    text(StatusCode::OK, "rmh-proxy: ok")
}

pub async fn ping() -> Json<serde_json::Value> {
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64;
    Json(json!({ "ok": true, "t": t }))
}

pub async fn diag(State(state): State<AppState>) -> Json<serde_json::Value> {
    let config = &state.config;
    Json(json!({
        "ok": true,
        "version": env!("CARGO_PKG_VERSION"),
        "has_app_token": config.upstream.app_token.is_some(),
        "has_gmaps_key": config.photo.gmaps_api_key.is_some(),
        "fallback_policy": config.fallback.policy.as_str(),
    }))
}

/// The dataset proxy.
pub async fn cms_proxy(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Response {
    let start = Instant::now();
    let request_id = request_id(&headers);

    let descriptor = match RequestDescriptor::from_query(query.as_deref().unwrap_or(""), &state.config) {
        Ok(descriptor) => descriptor,
        Err(err) => {
            tracing::info!(request_id, error = %err, "Rejected proxy request");
            let response = err.into_response();
            metrics::record_request("cms-proxy", response.status().as_u16(), start);
            return response;
        }
    };

    tracing::debug!(
        request_id,
        dataset = %descriptor.dataset,
        size = descriptor.size,
        offset = descriptor.offset,
        "Resolving dataset"
    );

    let response = match state.resolver.resolve(&descriptor).await {
        Ok(mut resolved) => {
            if descriptor.kind == DatasetKind::Hospitals {
                if let Some(base) = public_base(&state, &headers) {
                    attach_photo_urls(&mut resolved.rows, &base);
                }
            }
            resolved.into_response()
        }
        Err(err) => err.into_response(),
    };
    metrics::record_request("cms-proxy", response.status().as_u16(), start);
    response
}

fn public_base(state: &AppState, headers: &HeaderMap) -> Option<String> {
    if let Some(url) = &state.config.listener.public_url {
        return Some(url.clone());
    }
    headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(|host| format!("http://{host}"))
}

fn attach_photo_urls(rows: &mut [CanonicalRow], base: &str) {
    for row in rows {
        if let CanonicalRow::Hospital(hospital) = row {
            if let Some(id) = hospital.provider_id.as_deref() {
                hospital.photo_url = Some(photo_url(base, id));
            }
        }
    }
}

pub async fn hcahps_sample(State(state): State<AppState>) -> Response {
    let start = Instant::now();
    let response = match state.resolver.hcahps_sample().await {
        Ok(sample) => Json(sample).into_response(),
        Err(FetchError::MetadataResolution(_)) => Json(json!({
            "provider_ids": [],
            "sample": [],
            "note": "No CSV distribution found",
        }))
        .into_response(),
        Err(err) => {
            tracing::warn!(error = %err, "HCAHPS sample failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": "hcahps-sample failed", "detail": err.to_string() })),
            )
                .into_response()
        }
    };
    metrics::record_request("hcahps-sample", response.status().as_u16(), start);
    response
}

pub async fn hospital_photo(State(state): State<AppState>, RawQuery(query): RawQuery) -> Response {
    let start = Instant::now();
    let params = PhotoParams::from_query(query.as_deref().unwrap_or(""));
    let response = serve_photo(&state.resolver, params).await;
    metrics::record_request("hospital-photo", response.status().as_u16(), start);
    response
}

pub async fn not_found() -> Response {
    text(StatusCode::NOT_FOUND, "Not Found")
}
