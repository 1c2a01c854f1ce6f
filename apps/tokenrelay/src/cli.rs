use std::time::Duration;

use clap::Parser;

use tokenrelay_core::{CoreConfig, DEFAULT_BODY_LIMIT, DEFAULT_ROUTE};
use tokenrelay_protocol::huggingface::text_generation::request::{
    DEFAULT_MAX_NEW_TOKENS, TextGenerationParameters,
};
use tokenrelay_provider_core::DEFAULT_TOKENS_VAR;
use tokenrelay_provider_impl::HuggingFaceConfig;
use tokenrelay_provider_impl::provider::huggingface::DEFAULT_INFERENCE_URL;

#[derive(Debug, Clone, Parser)]
#[command(name = "tokenrelay", version, about = "Inference relay with bearer token failover")]
pub(crate) struct Cli {
    #[arg(long, env = "TOKENRELAY_HOST", default_value = "127.0.0.1")]
    pub host: String,
    #[arg(long, env = "TOKENRELAY_PORT", default_value_t = 8080)]
    pub port: u16,
    /// Path the relay answers on.
    #[arg(long, env = "TOKENRELAY_ROUTE", default_value = DEFAULT_ROUTE)]
    pub route: String,
    /// Environment variable holding the comma separated token list. Read on every request.
    #[arg(long, env = "TOKENRELAY_TOKENS_VAR", default_value = DEFAULT_TOKENS_VAR)]
    pub tokens_var: String,
    #[arg(long, env = "HF_INFERENCE_URL", default_value = DEFAULT_INFERENCE_URL)]
    pub upstream_url: String,
    /// Per attempt, in seconds.
    #[arg(long, env = "TOKENRELAY_TIMEOUT_SECS", default_value_t = 8)]
    pub timeout_secs: u64,
    #[arg(long, env = "TOKENRELAY_MAX_NEW_TOKENS", default_value_t = DEFAULT_MAX_NEW_TOKENS)]
    pub max_new_tokens: u32,
    /// Outbound proxy for upstream calls (http, https or socks5 URL).
    #[arg(long, env = "TOKENRELAY_PROXY")]
    pub proxy: Option<String>,
    /// Largest accepted request body, in bytes.
    #[arg(long, env = "TOKENRELAY_BODY_LIMIT", default_value_t = DEFAULT_BODY_LIMIT)]
    pub body_limit: usize,
    #[arg(long, env = "TOKENRELAY_LOG_JSON", default_value_t = false)]
    pub log_json: bool,
}

impl Cli {
    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.timeout_secs == 0 {
            return Err("timeout must be at least one second".to_string());
        }
        if self.upstream_url.trim().is_empty() {
            return Err("upstream url must not be empty".to_string());
        }
        if self.tokens_var.trim().is_empty() {
            return Err("tokens variable name must not be empty".to_string());
        }
        Ok(())
    }

    pub(crate) fn bind(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub(crate) fn provider_config(&self) -> HuggingFaceConfig {
        HuggingFaceConfig {
            url: self.upstream_url.trim().to_string(),
            timeout: Duration::from_secs(self.timeout_secs),
            parameters: TextGenerationParameters {
                max_new_tokens: self.max_new_tokens,
                ..TextGenerationParameters::default()
            },
            proxy: self.proxy.clone(),
        }
    }

    pub(crate) fn core_config(&self) -> CoreConfig {
        CoreConfig {
            route: self.route.clone(),
            body_limit: self.body_limit,
        }
    }
}
