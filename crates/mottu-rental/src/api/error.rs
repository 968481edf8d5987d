//! HTTP error envelope

use crate::error::RentalError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Failure raised by the rental domain or its store
    #[error(transparent)]
    Rental(#[from] RentalError),

    /// No API key header on a protected route
    #[error("Authentication required: {message}")]
    MissingAuthentication { message: String },

    /// API key present but wrong
    #[error("Authentication error: {message}")]
    Authentication { message: String },

    /// Request could not be parsed
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error("Service temporarily unavailable")]
    ServiceUnavailable,
}

pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Rental(e) => e.error_code(),
            ApiError::MissingAuthentication { .. } => "MOTTU_AUTH_MISSING",
            ApiError::Authentication { .. } => "MOTTU_AUTH_ERROR",
            ApiError::BadRequest { .. } => "MOTTU_BAD_REQUEST",
            ApiError::ServiceUnavailable => "MOTTU_SERVICE_UNAVAILABLE",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Rental(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            ApiError::Rental(e) if e.is_conflict() => StatusCode::CONFLICT,
            ApiError::Rental(e) if e.is_internal() => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Rental(_) => StatusCode::BAD_REQUEST,
            ApiError::MissingAuthentication { .. } | ApiError::Authentication { .. } => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Infrastructure details stay in the logs
        let message = if status.is_server_error() {
            error!("Request failed: {}", self);
            match &self {
                ApiError::ServiceUnavailable => self.to_string(),
                _ => "Internal server error".to_string(),
            }
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "error": {
                "code": self.error_code(),
                "message": message,
                "timestamp": chrono::Utc::now(),
            }
        }));

        (status, body).into_response()
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}
