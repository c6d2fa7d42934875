//! Shared response shapes and error translation

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

/// Error body returned on every failed request
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: u16,
}

/// Message body returned by the lending endpoints
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failed-request response type used by all handlers
pub type ApiError = (StatusCode, Json<ErrorBody>);

/// Translate a subsystem error into an HTTP response
pub fn reject(code: u16, message: String) -> ApiError {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorBody { error: message, code }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reject_maps_status() {
        let (status, Json(body)) = reject(403, "Admin access required".to_string());
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body.code, 403);
        assert_eq!(body.error, "Admin access required");
    }

    #[test]
    fn test_reject_bad_code_falls_back_to_500() {
        let (status, _) = reject(9999, "weird".to_string());
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
