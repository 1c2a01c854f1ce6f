use http::StatusCode;

use tokenrelay_provider_core::{AttemptFailure, ProxyResponse};

pub fn network_failure(err: wreq::Error) -> AttemptFailure {
    AttemptFailure::Transport(err.to_string())
}

/// Reads the whole upstream body. Only a plain 200 is relayed; every other
/// status, 2xx included, becomes a failure carrying the body for logs.
pub async fn handle_response(response: wreq::Response) -> Result<ProxyResponse, AttemptFailure> {
    let status = response.status();
    let body = response.bytes().await.map_err(network_failure)?;

    if status != StatusCode::OK {
        return Err(AttemptFailure::Status { status, body });
    }
    Ok(ProxyResponse { status, body })
}
