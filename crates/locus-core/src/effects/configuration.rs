//! Device identity configuration port

use super::storage::StorageError;
use async_trait::async_trait;

#[async_trait]
pub trait ConfigurationEffects: Send + Sync {
    /// Persist the device id and telemetry salt together.
    async fn initialize_identity(&self, device_id: &str, salt: &str) -> Result<(), StorageError>;

    async fn device_id(&self) -> Result<Option<String>, StorageError>;

    async fn telemetry_salt(&self) -> Result<Option<String>, StorageError>;
}
