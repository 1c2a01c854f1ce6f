use async_trait::async_trait;

use tokenrelay_protocol::relay::generate::GenerateRequest;

use crate::credential_pool::Credential;
use crate::failure::AttemptFailure;
use crate::request::CallContext;
use crate::response::ProxyResponse;

/// One upstream inference backend. `attempt` performs a single call with a
/// single credential; rotation across the pool is the caller's business.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    async fn attempt(
        &self,
        req: &GenerateRequest,
        credential: &Credential,
        ctx: &CallContext,
    ) -> Result<ProxyResponse, AttemptFailure>;
}
