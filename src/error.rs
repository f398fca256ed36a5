use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{gateway::GatewayError, models::MessageResponse, repository::RepositoryError};

/// ApiError
///
/// The single error type returned by the auth extractor and every handler.
/// Each variant maps to one status code and renders as `{ "success": false, "message": ... }`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Please login to access this resource")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("payment gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("database error: {0}")]
    Database(#[from] RepositoryError),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Body extraction failures (bad JSON, missing fields, wrong content type) are client errors.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Gateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Upstream and storage failures are logged in full but only summarised to the client.
        let message = match &self {
            ApiError::Gateway(e) => {
                tracing::error!(error = %e, "payment gateway call failed");
                "Payment gateway unavailable".to_string()
            }
            ApiError::Database(e) => {
                tracing::error!(error = %e, "repository call failed");
                "Internal Server Error".to_string()
            }
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "internal error");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };

        (
            status,
            Json(MessageResponse {
                success: false,
                message,
            }),
        )
            .into_response()
    }
}
