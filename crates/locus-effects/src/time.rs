//! Layer 3: Time Effect Handler - Production Only
//!
//! Delegates to the system clock and the tokio timer. Virtual-time handlers
//! belong in `locus-testkit`.

use async_trait::async_trait;
use locus_core::effects::PhysicalTimeEffects;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Real time handler for production use
#[derive(Debug, Clone, Copy, Default)]
pub struct RealTimeHandler;

impl RealTimeHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PhysicalTimeEffects for RealTimeHandler {
    #[allow(clippy::disallowed_methods)]
    async fn now_ms(&self) -> u64 {
        // SystemTime::now() is allowed in production handlers that implement effect traits.
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
    }

    async fn sleep_ms(&self, ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}
