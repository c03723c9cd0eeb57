//! Typed credential persistence port

use super::storage::StorageError;
use crate::credentials::{BootstrapCredentials, RuntimeCredentials};
use crate::state::OnboardingStage;
use async_trait::async_trait;

/// Encrypted persistence for the credential records the repository owns.
///
/// `load_*` returns `Ok(None)` only when no record exists. A record that
/// exists but cannot be decrypted or decoded is an error.
#[async_trait]
pub trait CredentialStoreEffects: Send + Sync {
    async fn save_bootstrap(&self, creds: &BootstrapCredentials) -> Result<(), StorageError>;
    async fn load_bootstrap(&self) -> Result<Option<BootstrapCredentials>, StorageError>;
    async fn clear_bootstrap(&self) -> Result<(), StorageError>;

    async fn save_runtime(&self, creds: &RuntimeCredentials) -> Result<(), StorageError>;
    async fn load_runtime(&self) -> Result<Option<RuntimeCredentials>, StorageError>;
    async fn clear_runtime(&self) -> Result<(), StorageError>;

    async fn save_onboarding_stage(&self, stage: OnboardingStage) -> Result<(), StorageError>;
    async fn load_onboarding_stage(&self) -> Result<Option<OnboardingStage>, StorageError>;
}
