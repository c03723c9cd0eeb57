//! CloudFormation stack lifecycle port

use crate::credentials::BootstrapCredentials;
use crate::errors::LocusResult;
use crate::stack::{StackDetails, StackEvent};
use async_trait::async_trait;
use std::collections::HashMap;

/// Create and inspect CloudFormation stacks using bootstrap credentials.
#[async_trait]
pub trait StackLifecycleEffects: Send + Sync {
    /// Start stack creation; returns the stack id (ARN).
    async fn create_stack(
        &self,
        creds: &BootstrapCredentials,
        stack_name: &str,
        template_body: &str,
        parameters: &HashMap<String, String>,
    ) -> LocusResult<String>;

    async fn describe_stack(
        &self,
        creds: &BootstrapCredentials,
        stack_name: &str,
    ) -> LocusResult<StackDetails>;

    /// Resource events for the stack, in any order.
    ///
    /// Adapters without event support keep the default.
    async fn describe_stack_events(
        &self,
        _creds: &BootstrapCredentials,
        _stack_name: &str,
    ) -> LocusResult<Vec<StackEvent>> {
        Ok(Vec::new())
    }
}
