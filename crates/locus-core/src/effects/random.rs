//! Randomness port

use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait RandomEffects: Send + Sync {
    /// `len` bytes from a cryptographically secure source.
    async fn random_bytes(&self, len: usize) -> Vec<u8>;

    async fn new_uuid(&self) -> Uuid;
}
