use bytes::Bytes;
use http::StatusCode;

/// A successful upstream reply, relayed to the caller as-is.
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl ProxyResponse {
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self {
            status: StatusCode::OK,
            body: body.into(),
        }
    }
}
