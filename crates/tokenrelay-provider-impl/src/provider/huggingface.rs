use std::time::{Duration, Instant};

use async_trait::async_trait;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue};
use tracing::{info, warn};

use tokenrelay_protocol::huggingface::text_generation::request::{
    TextGenerationParameters, TextGenerationRequest,
};
use tokenrelay_protocol::relay::generate::GenerateRequest;
use tokenrelay_provider_core::{AttemptFailure, CallContext, Credential, Provider, ProxyResponse};

use crate::client::build_client;
use crate::upstream::{handle_response, network_failure};

pub const PROVIDER_NAME: &str = "huggingface";
pub const DEFAULT_INFERENCE_URL: &str = "https://api-inference.huggingface.co/models/gpt2";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Debug, Clone)]
pub struct HuggingFaceConfig {
    pub url: String,
    /// Bounds one attempt end to end: connect, send and body read.
    pub timeout: Duration,
    pub parameters: TextGenerationParameters,
    pub proxy: Option<String>,
}

impl Default for HuggingFaceConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_INFERENCE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            parameters: TextGenerationParameters::default(),
            proxy: None,
        }
    }
}

pub struct HuggingFaceProvider {
    client: wreq::Client,
    config: HuggingFaceConfig,
}

impl HuggingFaceProvider {
    pub fn new(config: HuggingFaceConfig) -> Result<Self, wreq::Error> {
        let client = build_client(config.proxy.as_deref())?;
        Ok(Self { client, config })
    }

    async fn send(
        &self,
        headers: HeaderMap,
        body: &TextGenerationRequest,
    ) -> Result<ProxyResponse, AttemptFailure> {
        let response = self
            .client
            .post(self.config.url.as_str())
            .headers(headers)
            .json(body)
            .send()
            .await
            .map_err(network_failure)?;
        handle_response(response).await
    }
}

#[async_trait]
impl Provider for HuggingFaceProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn attempt(
        &self,
        req: &GenerateRequest,
        credential: &Credential,
        ctx: &CallContext,
    ) -> Result<ProxyResponse, AttemptFailure> {
        let headers = build_headers(credential.token())?;
        let body = TextGenerationRequest {
            inputs: req.inputs.clone(),
            parameters: self.config.parameters,
        };
        let started_at = Instant::now();
        info!(
            event = "upstream_request",
            trace_id = %ctx.trace_id,
            provider = %PROVIDER_NAME,
            attempt = credential.index() + 1,
            method = "POST",
            url = %self.config.url
        );

        let result = match tokio::time::timeout(self.config.timeout, self.send(headers, &body)).await
        {
            Ok(result) => result,
            Err(_) => Err(AttemptFailure::Timeout(self.config.timeout)),
        };

        match &result {
            Ok(response) => info!(
                event = "upstream_response",
                trace_id = %ctx.trace_id,
                provider = %PROVIDER_NAME,
                attempt = credential.index() + 1,
                status = response.status.as_u16(),
                elapsed_ms = started_at.elapsed().as_millis()
            ),
            Err(failure) => warn!(
                event = "upstream_response",
                trace_id = %ctx.trace_id,
                provider = %PROVIDER_NAME,
                attempt = credential.index() + 1,
                status = failure.status().map(|status| status.as_u16()).unwrap_or_default(),
                elapsed_ms = started_at.elapsed().as_millis(),
                error = %failure
            ),
        }
        result
    }
}

fn build_headers(token: &str) -> Result<HeaderMap, AttemptFailure> {
    let mut headers = HeaderMap::new();
    let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|err| AttemptFailure::InvalidCredential(err.to_string()))?;
    auth.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}
