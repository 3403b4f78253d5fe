use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::geocode::GeocodeError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad input. The message lists every failed check, joined with commas,
    /// so a form can show them all at once.
    #[error("{0}")]
    Validation(String),
    #[error("Page Not Found")]
    NotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Page Not Found".to_string()),
            ApiError::Internal(err) => {
                // Log the cause, hand clients the catch-all line.
                error!("Unhandled error: {err:#}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong!".to_string())
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<GeocodeError> for ApiError {
    fn from(value: GeocodeError) -> Self {
        Self::Internal(value.into())
    }
}
