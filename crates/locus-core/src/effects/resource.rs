//! Bundled resource port

use crate::errors::LocusResult;
use async_trait::async_trait;

#[async_trait]
pub trait ResourceLoaderEffects: Send + Sync {
    /// Body of the CloudFormation template that provisions a device stack.
    async fn stack_template(&self) -> LocusResult<String>;
}
