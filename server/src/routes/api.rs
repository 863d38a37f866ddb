use std::fmt::Write as _;

use axum::Json;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use chrono::NaiveDate;
use serde::Deserialize;
use terra_client::{LiveMetricsRequest, Tier, YearImageRequest};
use terra_shared::layers::ImageryLayer;

use crate::config::{
    LIVE_IMAGE_CACHE_CONTROL, METRICS_CACHE_CONTROL, PLACEHOLDER_IMAGE_CACHE_CONTROL,
};
use crate::error::ApiError;
use crate::state::{AppState, ObservabilitySnapshot};

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";
const PROVENANCE_HEADER: &str = "x-data-provenance";

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let snapshot_available = tokio::fs::try_exists(&state.config.snapshot_path)
        .await
        .unwrap_or(false);
    let observability = state.observability.snapshot();
    Json(serde_json::json!({
        "status": "ok",
        "regions": state.regions.len(),
        "backend_url": state.config.backend_url,
        "snapshot_available": snapshot_available,
        "observability": {
            "nasa_data_requests_total": observability.nasa_data_requests_total,
            "nasa_data_live_total": observability.nasa_data_live_total,
            "nasa_data_static_total": observability.nasa_data_static_total,
            "nasa_data_synthesized_total": observability.nasa_data_synthesized_total,
            "modis_image_requests_total": observability.modis_image_requests_total,
            "modis_image_placeholders_total": observability.modis_image_placeholders_total,
            "invalid_requests_total": observability.invalid_requests_total,
            "not_modified_total": observability.not_modified_total,
        }
    }))
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = render_prometheus_metrics(state.regions.len(), state.observability.snapshot());

    (
        [
            (header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-store"),
        ],
        body,
    )
}

fn render_prometheus_metrics(region_count: usize, observability: ObservabilitySnapshot) -> String {
    let mut body = String::new();
    let _ = writeln!(
        body,
        "# HELP terra_regions Number of regions in the loaded catalogue."
    );
    let _ = writeln!(body, "# TYPE terra_regions gauge");
    let _ = writeln!(body, "terra_regions {region_count}");

    let _ = writeln!(
        body,
        "# HELP terra_nasa_data_requests_total Live metrics requests, by serving tier."
    );
    let _ = writeln!(body, "# TYPE terra_nasa_data_requests_total counter");
    for (tier, count) in [
        (Tier::Live, observability.nasa_data_live_total),
        (Tier::StaticFallback, observability.nasa_data_static_total),
        (Tier::Synthesized, observability.nasa_data_synthesized_total),
    ] {
        let _ = writeln!(
            body,
            "terra_nasa_data_requests_total{{tier=\"{tier}\"}} {count}"
        );
    }

    let _ = writeln!(
        body,
        "# HELP terra_modis_image_requests_total Imagery requests that passed validation."
    );
    let _ = writeln!(body, "# TYPE terra_modis_image_requests_total counter");
    let _ = writeln!(
        body,
        "terra_modis_image_requests_total {}",
        observability.modis_image_requests_total
    );

    let _ = writeln!(
        body,
        "# HELP terra_modis_image_placeholders_total Imagery requests answered with a generated placeholder."
    );
    let _ = writeln!(body, "# TYPE terra_modis_image_placeholders_total counter");
    let _ = writeln!(
        body,
        "terra_modis_image_placeholders_total {}",
        observability.modis_image_placeholders_total
    );

    let _ = writeln!(
        body,
        "# HELP terra_invalid_requests_total Requests rejected with 400."
    );
    let _ = writeln!(body, "# TYPE terra_invalid_requests_total counter");
    let _ = writeln!(
        body,
        "terra_invalid_requests_total {}",
        observability.invalid_requests_total
    );

    let _ = writeln!(
        body,
        "# HELP terra_not_modified_total Conditional requests answered with 304."
    );
    let _ = writeln!(body, "# TYPE terra_not_modified_total counter");
    let _ = writeln!(
        body,
        "terra_not_modified_total {}",
        observability.not_modified_total
    );

    body
}

/// Live metrics: backend, then the snapshot file, then an all-unknown payload.
/// Always 200.
pub async fn get_nasa_data(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let resolved = state.resolver.resolve(&LiveMetricsRequest).await;
    state
        .observability
        .record_nasa_data_request(resolved.provenance);

    let body = Bytes::from(serde_json::to_vec(&resolved.payload)?);
    let etag = body_etag(&body);
    let cache_control = match resolved.provenance {
        Tier::Live | Tier::StaticFallback => METRICS_CACHE_CONTROL,
        Tier::Synthesized => "no-store",
    };

    let mut response = if if_none_match_matches(&headers, &etag) {
        state.observability.record_not_modified();
        not_modified_response(cache_control, Some(etag.as_str()))
    } else {
        json_bytes_response(body, cache_control, Some(etag.as_str()))
    };
    response.headers_mut().insert(
        PROVENANCE_HEADER,
        HeaderValue::from_static(resolved.provenance.as_str()),
    );
    Ok(response)
}

#[derive(Debug, Default, Deserialize)]
pub struct ModisImageQuery {
    pub date: Option<String>,
    pub layer: Option<String>,
}

/// One yearly frame: the backend's image, or a generated placeholder.
pub async fn get_modis_image(
    State(state): State<AppState>,
    Query(query): Query<ModisImageQuery>,
) -> Result<Response, ApiError> {
    let request = match parse_image_query(&query) {
        Ok(request) => request,
        Err(e) => {
            state.observability.record_invalid_request();
            return Err(e);
        }
    };

    let resolved = state.resolver.resolve(&request).await;
    state
        .observability
        .record_modis_image_request(resolved.provenance);

    if resolved.payload.bytes.is_empty() {
        return Err(ApiError::ImageUnavailable);
    }

    let cache_control = match resolved.provenance {
        Tier::Synthesized => PLACEHOLDER_IMAGE_CACHE_CONTROL,
        Tier::Live | Tier::StaticFallback => LIVE_IMAGE_CACHE_CONTROL,
    };
    let content_type = HeaderValue::from_str(&resolved.payload.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    let mut response = Response::new(Body::from(resolved.payload.bytes));
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(cache_control),
    );
    headers.insert(
        PROVENANCE_HEADER,
        HeaderValue::from_static(resolved.provenance.as_str()),
    );
    Ok(response)
}

fn parse_image_query(query: &ModisImageQuery) -> Result<YearImageRequest, ApiError> {
    let date = query.date.as_deref().map(str::trim).unwrap_or_default();
    let layer = query.layer.as_deref().map(str::trim).unwrap_or_default();
    if date.is_empty() || layer.is_empty() {
        return Err(ApiError::MissingImageParams);
    }

    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| ApiError::InvalidDate(date.to_string()))?;
    let layer =
        ImageryLayer::parse(layer).ok_or_else(|| ApiError::InvalidLayer(layer.to_string()))?;
    Ok(YearImageRequest { layer, date })
}

/// Strong ETag over the exact response body.
pub(crate) fn body_etag(body: &[u8]) -> String {
    format!("\"{:08x}\"", crc32fast::hash(body))
}

pub(crate) fn json_bytes_response(
    body: Bytes,
    cache_control: &'static str,
    etag: Option<&str>,
) -> Response {
    let mut response = Response::new(Body::from(body));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(cache_control),
    );
    if let Some(etag) = etag
        && let Ok(etag_header) = HeaderValue::from_str(etag)
    {
        headers.insert(header::ETAG, etag_header);
    }
    response
}

pub(crate) fn not_modified_response(cache_control: &'static str, etag: Option<&str>) -> Response {
    let mut response = StatusCode::NOT_MODIFIED.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(cache_control),
    );
    if let Some(etag) = etag
        && let Ok(etag_header) = HeaderValue::from_str(etag)
    {
        headers.insert(header::ETAG, etag_header);
    }
    response
}

fn normalize_etag(candidate: &str) -> &str {
    candidate.strip_prefix("W/").unwrap_or(candidate).trim()
}

pub(crate) fn if_none_match_matches(headers: &HeaderMap, etag: &str) -> bool {
    let Some(value) = headers.get(header::IF_NONE_MATCH) else {
        return false;
    };
    let Ok(raw) = value.to_str() else {
        return false;
    };

    raw.split(',').any(|candidate| {
        let candidate = candidate.trim();
        candidate == "*" || normalize_etag(candidate) == normalize_etag(etag)
    })
}
