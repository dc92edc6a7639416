//! Validation policy collaborator

use async_trait::async_trait;

use crate::config::CliConfig;
use crate::context::InvocationContext;
use crate::error::StackError;

/// Decides whether a component passes its validation policies
///
/// `Ok(false)` is a policy verdict; `Err` means the policies could not be
/// evaluated at all.
#[async_trait]
pub trait PolicyValidator: Send + Sync {
    async fn validate(
        &self,
        config: &CliConfig,
        ctx: &InvocationContext,
    ) -> Result<bool, StackError>;
}

/// Accepts every component
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllPolicy;

#[async_trait]
impl PolicyValidator for AllowAllPolicy {
    async fn validate(
        &self,
        _config: &CliConfig,
        _ctx: &InvocationContext,
    ) -> Result<bool, StackError> {
        Ok(true)
    }
}

/// Returns a fixed verdict; for tests
#[derive(Debug, Clone, Copy)]
pub struct MockPolicyValidator {
    pub verdict: bool,
}

#[async_trait]
impl PolicyValidator for MockPolicyValidator {
    async fn validate(
        &self,
        _config: &CliConfig,
        _ctx: &InvocationContext,
    ) -> Result<bool, StackError> {
        Ok(self.verdict)
    }
}
