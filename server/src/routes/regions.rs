use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use terra_shared::region::find_region;

use crate::config::REGIONS_CACHE_CONTROL;
use crate::error::ApiError;
use crate::routes::api::{
    body_etag, if_none_match_matches, json_bytes_response, not_modified_response,
};
use crate::state::AppState;

/// Serve the pre-serialized catalogue.
pub async fn list_regions(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let json: Arc<Bytes> = Arc::clone(&state.regions_json);
    let etag = body_etag(&json);

    if if_none_match_matches(&headers, &etag) {
        state.observability.record_not_modified();
        return not_modified_response(REGIONS_CACHE_CONTROL, Some(etag.as_str()));
    }

    json_bytes_response((*json).clone(), REGIONS_CACHE_CONTROL, Some(etag.as_str()))
}

pub async fn get_region(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(region) = find_region(&state.regions, &slug) else {
        return Err(ApiError::RegionNotFound(slug));
    };
    Ok((
        [(header::CACHE_CONTROL, REGIONS_CACHE_CONTROL)],
        Json(region.clone()),
    ))
}
