use std::time::Duration;

use bytes::Bytes;
use http::StatusCode;

const BODY_SNIPPET_LIMIT: usize = 256;

/// Why a single credential attempt did not produce a relayable reply.
#[derive(Debug, thiserror::Error)]
pub enum AttemptFailure {
    #[error("upstream returned {status}")]
    Status { status: StatusCode, body: Bytes },
    #[error("network error: {0}")]
    Transport(String),
    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("invalid credential: {0}")]
    InvalidCredential(String),
}

impl AttemptFailure {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            AttemptFailure::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Rate limited or overloaded: the credential itself is fine, just busy.
    pub fn is_busy(&self) -> bool {
        matches!(
            self.status(),
            Some(StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE)
        )
    }

    /// Leading part of the upstream error body, for logs.
    pub fn body_snippet(&self) -> Option<String> {
        let AttemptFailure::Status { body, .. } = self else {
            return None;
        };
        if body.is_empty() {
            return None;
        }
        let text = String::from_utf8_lossy(body);
        Some(text.chars().take(BODY_SNIPPET_LIMIT).collect())
    }
}

/// Whether the rotation loop should move on to the next credential.
///
/// Every failure currently qualifies: busy statuses, other error statuses,
/// transport errors and timeouts alike. Returning `false` for a variant ends
/// the loop early with the final failure response.
pub fn is_retryable(failure: &AttemptFailure) -> bool {
    match failure {
        AttemptFailure::Status { .. } => true,
        AttemptFailure::Transport(_) => true,
        AttemptFailure::Timeout(_) => true,
        AttemptFailure::InvalidCredential(_) => true,
    }
}
