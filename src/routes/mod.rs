pub mod auth;
pub mod sync;
pub mod webhook;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use calsync_core::error::SyncError;

/// Standard API error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Convert sync errors to HTTP responses
pub struct AppError(SyncError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            SyncError::NotFound(_) => StatusCode::NOT_FOUND,
            SyncError::InvalidState(_) => StatusCode::BAD_REQUEST,
            SyncError::NotConnected(_) | SyncError::CredentialsInvalid { .. } => {
                StatusCode::UNAUTHORIZED
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse {
            error: self.0.to_string(),
        });
        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<SyncError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
