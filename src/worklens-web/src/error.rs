//! HTTP error responses
//!
//! Responses are plain text: callers of the trigger endpoint read the
//! body, not a structured payload. Unlike the endpoint this replaces, a
//! failed run gets a real 500 instead of a 200 with an error string.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("pipeline error: {0}")]
    Pipeline(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Pipeline(err) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}")),
        };

        (status, message).into_response()
    }
}
