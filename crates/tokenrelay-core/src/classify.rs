use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use serde_json::Value as JsonValue;

use tokenrelay_protocol::relay::generate::GenerateRequest;

use crate::error::ProxyError;

/// Validates an inbound body: present, JSON, then a usable `inputs`.
pub fn classify_request(body: &[u8]) -> Result<GenerateRequest, ProxyError> {
    if body.is_empty() {
        return Err(ProxyError::missing_body());
    }
    let value: JsonValue =
        serde_json::from_slice(body).map_err(|_| ProxyError::invalid_json())?;
    GenerateRequest::from_json(&value).ok_or_else(ProxyError::missing_inputs)
}

/// Maps a failed body read (over the size limit, aborted upload) onto the
/// relay's own error responses.
pub fn body_rejection(rejection: &BytesRejection) -> ProxyError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ProxyError::payload_too_large()
    } else {
        ProxyError::missing_body()
    }
}
