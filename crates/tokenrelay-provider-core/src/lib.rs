pub mod credential_pool;
pub mod failure;
pub mod provider;
pub mod request;
pub mod response;
pub mod source;

pub use credential_pool::{Credential, CredentialPool, PoolError};
pub use failure::{AttemptFailure, is_retryable};
pub use provider::Provider;
pub use request::CallContext;
pub use response::ProxyResponse;
pub use source::{DEFAULT_TOKENS_VAR, EnvTokenSource, SourceError, StaticTokenSource, TokenSource};
