//! Error responses
//!
//! Maps application errors onto HTTP responses with a JSON body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bridge_common::{AppError, ErrorResponse};
use thiserror::Error;

/// HTTP-facing wrapper around [`AppError`]
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] AppError);

impl ApiError {
    /// Get HTTP status code for this error
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self.0, code = self.0.error_code(), "Request failed");
        }

        (status, Json(ErrorResponse::from(&self.0))).into_response()
    }
}
