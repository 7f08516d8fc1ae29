use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeskError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("backend reported an error: {0}")]
    Backend(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("no record with id {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, DeskError>;

/// Errors surfaced by the data API.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Data not available")]
    DataUnavailable,

    #[error("Malformed payload")]
    MalformedPayload,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::DataUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::MalformedPayload => StatusCode::BAD_REQUEST,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
