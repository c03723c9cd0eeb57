//! Physical time port
//!
//! Every wait in the provisioning flow goes through this trait, so tests can
//! drive the full ten-minute polling budget in virtual time.

use async_trait::async_trait;

#[async_trait]
pub trait PhysicalTimeEffects: Send + Sync {
    /// Milliseconds since the Unix epoch.
    async fn now_ms(&self) -> u64;

    async fn sleep_ms(&self, ms: u64);
}
