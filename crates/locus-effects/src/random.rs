//! Random effect handler
//!
//! Uses the thread-local CSPRNG. This is the effect handler layer where
//! actual system randomness is provided.

#![allow(clippy::disallowed_methods)]

use async_trait::async_trait;
use locus_core::effects::RandomEffects;
use rand::RngCore;
use uuid::Uuid;

/// Real random handler using cryptographically secure randomness
#[derive(Debug, Clone, Copy, Default)]
pub struct RealRandomHandler;

impl RealRandomHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RandomEffects for RealRandomHandler {
    async fn random_bytes(&self, len: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; len];
        rand::thread_rng().fill_bytes(&mut bytes);
        bytes
    }

    async fn new_uuid(&self) -> Uuid {
        Uuid::new_v4()
    }
}
