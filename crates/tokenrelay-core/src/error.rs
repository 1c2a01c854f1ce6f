use std::fmt::Display;

use axum::http::StatusCode;

/// A relay outcome that is answered with `{"error": message}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyError {
    pub status: StatusCode,
    pub message: String,
}

impl ProxyError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn no_tokens() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Server Error: No API tokens configured.",
        )
    }

    pub fn missing_body() -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Missing request body.")
    }

    pub fn payload_too_large() -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large.")
    }

    pub fn invalid_json() -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Invalid JSON.")
    }

    pub fn missing_inputs() -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Missing 'inputs' field.")
    }

    pub fn exhausted() -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "All tokens exhausted or busy.")
    }

    pub fn internal(detail: impl Display) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Internal Server Error: {detail}"),
        )
    }
}
