use std::future::Future;
use std::time::Instant;

use tracing::{info, warn};

use crate::failure::{AttemptFailure, is_retryable};
use crate::request::CallContext;

#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    index: usize,
    token: String,
}

impl Credential {
    pub fn new(index: usize, token: impl Into<String>) -> Self {
        Self {
            index,
            token: token.into(),
        }
    }

    /// Zero-based position in the pool.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

// Tokens stay out of Debug output so they never end up in logs.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("index", &self.index)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("all {attempts} credentials exhausted")]
    Exhausted { attempts: usize },
    #[error("credential #{index} rejected: {failure}")]
    Rejected {
        index: usize,
        failure: AttemptFailure,
    },
}

/// Ordered bearer tokens for a single request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialPool {
    credentials: Vec<Credential>,
}

impl CredentialPool {
    pub fn new(tokens: impl IntoIterator<Item = String>) -> Self {
        let credentials = tokens
            .into_iter()
            .enumerate()
            .map(|(index, token)| Credential::new(index, token))
            .collect();
        Self { credentials }
    }

    /// Comma separated list; entries are trimmed and blanks dropped.
    pub fn parse(raw: &str) -> Self {
        Self::new(
            raw.split(',')
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(str::to_string),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn credentials(&self) -> &[Credential] {
        &self.credentials
    }

    /// Runs `attempt` once per credential, in order, until one succeeds.
    ///
    /// Failures are logged and, when [`is_retryable`] allows, the next
    /// credential is tried. No credential is tried twice and there is no
    /// backoff between attempts.
    pub async fn execute<T, F, Fut>(&self, ctx: &CallContext, mut attempt: F) -> Result<T, PoolError>
    where
        F: FnMut(Credential) -> Fut,
        Fut: Future<Output = Result<T, AttemptFailure>>,
    {
        let total = self.credentials.len();
        for credential in &self.credentials {
            let index = credential.index();
            let started_at = Instant::now();
            info!(
                event = "credential_attempt",
                trace_id = %ctx.trace_id,
                attempt = index + 1,
                total = total
            );
            let failure = match attempt(credential.clone()).await {
                Ok(value) => return Ok(value),
                Err(failure) => failure,
            };
            let elapsed_ms = started_at.elapsed().as_millis();
            if failure.is_busy() {
                warn!(
                    event = "credential_busy",
                    trace_id = %ctx.trace_id,
                    attempt = index + 1,
                    status = failure.status().map(|status| status.as_u16()).unwrap_or_default(),
                    elapsed_ms = elapsed_ms,
                    "switching credential"
                );
            } else {
                let body = failure.body_snippet().unwrap_or_default();
                warn!(
                    event = "credential_failed",
                    trace_id = %ctx.trace_id,
                    attempt = index + 1,
                    elapsed_ms = elapsed_ms,
                    error = %failure,
                    body = %body
                );
            }
            if !is_retryable(&failure) {
                return Err(PoolError::Rejected { index, failure });
            }
        }
        warn!(
            event = "credentials_exhausted",
            trace_id = %ctx.trace_id,
            attempts = total
        );
        Err(PoolError::Exhausted { attempts: total })
    }
}
