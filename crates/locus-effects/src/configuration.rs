//! Device identity store
//!
//! The device id and telemetry salt are written as one record, so a crash
//! can never leave one without the other.

use async_trait::async_trait;
use locus_core::effects::{ConfigurationEffects, StorageEffects, StorageError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

pub const IDENTITY_KEY: &str = "device-identity";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct DeviceIdentity {
    device_id: String,
    telemetry_salt: String,
}

#[derive(Clone)]
pub struct IdentityStoreHandler {
    storage: Arc<dyn StorageEffects>,
}

impl IdentityStoreHandler {
    pub fn new(storage: Arc<dyn StorageEffects>) -> Self {
        Self { storage }
    }

    async fn identity(&self) -> Result<Option<DeviceIdentity>, StorageError> {
        let Some(bytes) = self.storage.retrieve(IDENTITY_KEY).await? else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StorageError::corrupted(format!("Failed to decode device identity: {e}")))
    }
}

#[async_trait]
impl ConfigurationEffects for IdentityStoreHandler {
    async fn initialize_identity(&self, device_id: &str, salt: &str) -> Result<(), StorageError> {
        let record = DeviceIdentity {
            device_id: device_id.to_string(),
            telemetry_salt: salt.to_string(),
        };
        let bytes = serde_json::to_vec(&record).map_err(|e| StorageError::WriteFailed {
            reason: e.to_string(),
        })?;
        self.storage.store(IDENTITY_KEY, bytes).await?;
        info!(device_id, "device identity initialized");
        Ok(())
    }

    async fn device_id(&self) -> Result<Option<String>, StorageError> {
        Ok(self.identity().await?.map(|identity| identity.device_id))
    }

    async fn telemetry_salt(&self) -> Result<Option<String>, StorageError> {
        Ok(self.identity().await?.map(|identity| identity.telemetry_salt))
    }
}
