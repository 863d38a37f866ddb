use axum::Json;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

/// Request failures surfaced to API clients as `{"error": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Date and layer parameters required")]
    MissingImageParams,
    #[error("Invalid date `{0}`, expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("Invalid layer `{0}`, expected chlorophyll or temperature")]
    InvalidLayer(String),
    #[error("Unknown region `{0}`")]
    RegionNotFound(String),
    #[error("Failed to generate image")]
    ImageUnavailable,
    #[error("Failed to encode response")]
    Encode(#[from] serde_json::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingImageParams | Self::InvalidDate(_) | Self::InvalidLayer(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::RegionNotFound(_) => StatusCode::NOT_FOUND,
            Self::ImageUnavailable | Self::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status().is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (
            self.status(),
            [(header::CACHE_CONTROL, "no-store")],
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}
