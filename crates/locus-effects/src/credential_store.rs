//! Credential store handler
//!
//! Serializes credential records as JSON into a `StorageEffects` backend,
//! which in production is the encrypted store.

use async_trait::async_trait;
use locus_core::effects::{CredentialStoreEffects, StorageEffects, StorageError};
use locus_core::{BootstrapCredentials, OnboardingStage, RuntimeCredentials};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;
use zeroize::Zeroizing;

pub const BOOTSTRAP_KEY: &str = "bootstrap-credentials";
pub const RUNTIME_KEY: &str = "runtime-credentials";
pub const ONBOARDING_STAGE_KEY: &str = "onboarding-stage";

#[derive(Clone)]
pub struct CredentialStoreHandler {
    storage: Arc<dyn StorageEffects>,
}

impl CredentialStoreHandler {
    pub fn new(storage: Arc<dyn StorageEffects>) -> Self {
        Self { storage }
    }

    async fn save<T: Serialize + Sync>(&self, key: &str, record: &T) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec(record).map_err(|e| StorageError::WriteFailed {
            reason: format!("Failed to encode {key}: {e}"),
        })?;
        self.storage.store(key, bytes).await
    }

    async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let Some(bytes) = self.storage.retrieve(key).await? else {
            return Ok(None);
        };
        let bytes = Zeroizing::new(bytes);
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StorageError::corrupted(format!("Failed to decode {key}: {e}")))
    }

    async fn clear(&self, key: &str) -> Result<(), StorageError> {
        let removed = self.storage.remove(key).await?;
        debug!(key, removed, "cleared record");
        Ok(())
    }
}

#[async_trait]
impl CredentialStoreEffects for CredentialStoreHandler {
    async fn save_bootstrap(&self, creds: &BootstrapCredentials) -> Result<(), StorageError> {
        self.save(BOOTSTRAP_KEY, creds).await
    }

    async fn load_bootstrap(&self) -> Result<Option<BootstrapCredentials>, StorageError> {
        self.load(BOOTSTRAP_KEY).await
    }

    async fn clear_bootstrap(&self) -> Result<(), StorageError> {
        self.clear(BOOTSTRAP_KEY).await
    }

    async fn save_runtime(&self, creds: &RuntimeCredentials) -> Result<(), StorageError> {
        self.save(RUNTIME_KEY, creds).await
    }

    async fn load_runtime(&self) -> Result<Option<RuntimeCredentials>, StorageError> {
        self.load(RUNTIME_KEY).await
    }

    async fn clear_runtime(&self) -> Result<(), StorageError> {
        self.clear(RUNTIME_KEY).await
    }

    async fn save_onboarding_stage(&self, stage: OnboardingStage) -> Result<(), StorageError> {
        self.save(ONBOARDING_STAGE_KEY, &stage).await
    }

    async fn load_onboarding_stage(&self) -> Result<Option<OnboardingStage>, StorageError> {
        self.load(ONBOARDING_STAGE_KEY).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorageHandler;
    use assert_matches::assert_matches;

    fn store() -> (MemoryStorageHandler, CredentialStoreHandler) {
        let memory = MemoryStorageHandler::new();
        let handler = CredentialStoreHandler::new(Arc::new(memory.clone()));
        (memory, handler)
    }

    #[tokio::test]
    async fn test_bootstrap_lifecycle() {
        let (_, handler) = store();
        assert_eq!(handler.load_bootstrap().await.unwrap(), None);

        let creds = BootstrapCredentials::new("AKIA", "secret", "token", "us-east-1");
        handler.save_bootstrap(&creds).await.unwrap();
        assert_eq!(handler.load_bootstrap().await.unwrap(), Some(creds));

        handler.clear_bootstrap().await.unwrap();
        handler.clear_bootstrap().await.unwrap();
        assert_eq!(handler.load_bootstrap().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_garbage_record_is_corrupted_not_absent() {
        let (memory, handler) = store();
        memory.store(RUNTIME_KEY, b"{not json".to_vec()).await.unwrap();
        assert_matches!(handler.load_runtime().await, Err(StorageError::Corrupted { .. }));
    }

    #[tokio::test]
    async fn test_onboarding_stage_round_trip() {
        let (_, handler) = store();
        assert_eq!(handler.load_onboarding_stage().await.unwrap(), None);
        handler
            .save_onboarding_stage(OnboardingStage::PermissionsPending)
            .await
            .unwrap();
        assert_eq!(
            handler.load_onboarding_stage().await.unwrap(),
            Some(OnboardingStage::PermissionsPending)
        );
    }
}
