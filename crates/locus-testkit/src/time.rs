//! Virtual clock
//!
//! `sleep_ms` advances the clock instead of waiting, so a ten-minute polling
//! budget runs in microseconds. Every sleep is recorded for assertions.

use async_trait::async_trait;
use locus_core::effects::PhysicalTimeEffects;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct SimulatedClock {
    inner: Arc<Mutex<ClockState>>,
}

#[derive(Debug)]
struct ClockState {
    now_ms: u64,
    sleeps: Vec<u64>,
}

impl SimulatedClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ClockState {
                now_ms: start_ms,
                sleeps: Vec::new(),
            })),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.inner.lock().now_ms += ms;
    }

    pub fn current_ms(&self) -> u64 {
        self.inner.lock().now_ms
    }

    /// Durations passed to `sleep_ms`, in call order.
    pub fn sleeps(&self) -> Vec<u64> {
        self.inner.lock().sleeps.clone()
    }

    pub fn total_slept_ms(&self) -> u64 {
        self.inner.lock().sleeps.iter().sum()
    }
}

impl Default for SimulatedClock {
    fn default() -> Self {
        Self::new(1_700_000_000_000)
    }
}

#[async_trait]
impl PhysicalTimeEffects for SimulatedClock {
    async fn now_ms(&self) -> u64 {
        self.current_ms()
    }

    async fn sleep_ms(&self, ms: u64) {
        {
            let mut state = self.inner.lock();
            state.now_ms += ms;
            state.sleeps.push(ms);
        }
        tokio::task::yield_now().await;
    }
}
