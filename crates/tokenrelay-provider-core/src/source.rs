use std::env::{self, VarError};

use crate::credential_pool::CredentialPool;

pub const DEFAULT_TOKENS_VAR: &str = "HF_TOKENS";

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("{var} is not valid unicode")]
    NotUnicode { var: String },
}

/// Where the credential pool comes from. Resolved again for every request.
pub trait TokenSource: Send + Sync {
    fn load(&self) -> Result<CredentialPool, SourceError>;
}

/// Reads a comma separated token list from a process environment variable.
#[derive(Debug, Clone)]
pub struct EnvTokenSource {
    var: String,
}

impl EnvTokenSource {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    pub fn var(&self) -> &str {
        &self.var
    }

    fn pool_from(&self, value: Result<String, VarError>) -> Result<CredentialPool, SourceError> {
        match value {
            Ok(raw) => Ok(CredentialPool::parse(&raw)),
            Err(VarError::NotPresent) => Ok(CredentialPool::default()),
            Err(VarError::NotUnicode(_)) => Err(SourceError::NotUnicode {
                var: self.var.clone(),
            }),
        }
    }
}

impl Default for EnvTokenSource {
    fn default() -> Self {
        Self::new(DEFAULT_TOKENS_VAR)
    }
}

impl TokenSource for EnvTokenSource {
    fn load(&self) -> Result<CredentialPool, SourceError> {
        self.pool_from(env::var(&self.var))
    }
}

/// Fixed token list, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenSource {
    raw: String,
}

impl StaticTokenSource {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }
}

impl TokenSource for StaticTokenSource {
    fn load(&self) -> Result<CredentialPool, SourceError> {
        Ok(CredentialPool::parse(&self.raw))
    }
}
