/// Error handling for the HTTP layer
///
/// Only the webhook and health endpoints return HTTP errors; everything that
/// goes wrong while handling a chat command is turned into a chat reply
/// instead. Handlers return `ApiResult<T>`, which converts into a JSON error
/// body with a matching status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// HTTP-level error
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Bad request (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Missing or wrong webhook secret (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g. "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match self {
            ApiError::BadRequest(msg) | ApiError::Unauthorized(msg) => msg,
        };

        let body = Json(ErrorResponse {
            error: code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let response = ApiError::Unauthorized("bad secret".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = ApiError::BadRequest("missing field".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
