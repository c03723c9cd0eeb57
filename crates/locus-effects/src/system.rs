//! Composite effect system
//!
//! `LocusEffectSystem` bundles one handler per effect trait and implements
//! every trait by delegation, so it satisfies `ProvisioningEffects` and
//! `RecoveryEffects` and can be shared as a single `Arc`.

use async_trait::async_trait;
use locus_core::effects::{
    BucketDirectoryEffects, ConfigurationEffects, CredentialStoreEffects, PhysicalTimeEffects,
    RandomEffects, ResourceLoaderEffects, StackLifecycleEffects, StorageEffects, StorageError,
};
use locus_core::{BootstrapCredentials, LocusConfig, LocusResult, StackDetails, StackEvent};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::configuration::IdentityStoreHandler;
use crate::credential_store::CredentialStoreHandler;
use crate::random::RealRandomHandler;
use crate::resource::{BundledTemplateLoader, FileTemplateLoader};
use crate::time::RealTimeHandler;

#[derive(Debug, thiserror::Error)]
pub enum EffectSystemError {
    #[error("Missing required component: {0}")]
    MissingComponent(&'static str),
}

#[derive(Clone)]
pub struct LocusEffectSystem {
    time: Arc<dyn PhysicalTimeEffects>,
    random: Arc<dyn RandomEffects>,
    stacks: Arc<dyn StackLifecycleEffects>,
    buckets: Arc<dyn BucketDirectoryEffects>,
    templates: Arc<dyn ResourceLoaderEffects>,
    identity: Arc<dyn ConfigurationEffects>,
    credentials: Arc<dyn CredentialStoreEffects>,
    storage: Arc<dyn StorageEffects>,
}

impl LocusEffectSystem {
    pub fn builder() -> LocusEffectSystemBuilder {
        LocusEffectSystemBuilder::default()
    }

    /// Store behind the credential and identity handlers.
    pub fn storage(&self) -> Arc<dyn StorageEffects> {
        self.storage.clone()
    }

    pub fn credential_store(&self) -> Arc<dyn CredentialStoreEffects> {
        self.credentials.clone()
    }
}

impl std::fmt::Debug for LocusEffectSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocusEffectSystem").finish_non_exhaustive()
    }
}

/// Builder for [`LocusEffectSystem`].
///
/// Cloud handlers and storage are required. Time, randomness and the template
/// loader default to the production handlers; the credential and identity
/// stores default to handlers over the configured storage.
#[derive(Default)]
pub struct LocusEffectSystemBuilder {
    time: Option<Arc<dyn PhysicalTimeEffects>>,
    random: Option<Arc<dyn RandomEffects>>,
    stacks: Option<Arc<dyn StackLifecycleEffects>>,
    buckets: Option<Arc<dyn BucketDirectoryEffects>>,
    templates: Option<Arc<dyn ResourceLoaderEffects>>,
    identity: Option<Arc<dyn ConfigurationEffects>>,
    credentials: Option<Arc<dyn CredentialStoreEffects>>,
    storage: Option<Arc<dyn StorageEffects>>,
}

impl LocusEffectSystemBuilder {
    /// Apply file-level settings (currently the template override).
    pub fn with_config(mut self, config: &LocusConfig) -> Self {
        if let Some(path) = &config.storage.template_path {
            self.templates = Some(Arc::new(FileTemplateLoader::new(path.clone())));
        }
        self
    }

    pub fn with_time(mut self, time: Arc<dyn PhysicalTimeEffects>) -> Self {
        self.time = Some(time);
        self
    }

    pub fn with_random(mut self, random: Arc<dyn RandomEffects>) -> Self {
        self.random = Some(random);
        self
    }

    pub fn with_stack_lifecycle(mut self, stacks: Arc<dyn StackLifecycleEffects>) -> Self {
        self.stacks = Some(stacks);
        self
    }

    pub fn with_bucket_directory(mut self, buckets: Arc<dyn BucketDirectoryEffects>) -> Self {
        self.buckets = Some(buckets);
        self
    }

    pub fn with_template_loader(mut self, templates: Arc<dyn ResourceLoaderEffects>) -> Self {
        self.templates = Some(templates);
        self
    }

    pub fn with_identity_store(mut self, identity: Arc<dyn ConfigurationEffects>) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn with_credential_store(mut self, credentials: Arc<dyn CredentialStoreEffects>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_storage(mut self, storage: Arc<dyn StorageEffects>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn build(self) -> Result<LocusEffectSystem, EffectSystemError> {
        let stacks = self
            .stacks
            .ok_or(EffectSystemError::MissingComponent("stack_lifecycle"))?;
        let buckets = self
            .buckets
            .ok_or(EffectSystemError::MissingComponent("bucket_directory"))?;
        let storage = self
            .storage
            .ok_or(EffectSystemError::MissingComponent("storage"))?;

        let credentials = self
            .credentials
            .unwrap_or_else(|| Arc::new(CredentialStoreHandler::new(storage.clone())));
        let identity = self
            .identity
            .unwrap_or_else(|| Arc::new(IdentityStoreHandler::new(storage.clone())));

        Ok(LocusEffectSystem {
            time: self.time.unwrap_or_else(|| Arc::new(RealTimeHandler::new())),
            random: self.random.unwrap_or_else(|| Arc::new(RealRandomHandler::new())),
            stacks,
            buckets,
            templates: self
                .templates
                .unwrap_or_else(|| Arc::new(BundledTemplateLoader::new())),
            identity,
            credentials,
            storage,
        })
    }
}

#[async_trait]
impl PhysicalTimeEffects for LocusEffectSystem {
    async fn now_ms(&self) -> u64 {
        self.time.now_ms().await
    }

    async fn sleep_ms(&self, ms: u64) {
        self.time.sleep_ms(ms).await;
    }
}

#[async_trait]
impl RandomEffects for LocusEffectSystem {
    async fn random_bytes(&self, len: usize) -> Vec<u8> {
        self.random.random_bytes(len).await
    }

    async fn new_uuid(&self) -> Uuid {
        self.random.new_uuid().await
    }
}

#[async_trait]
impl StackLifecycleEffects for LocusEffectSystem {
    async fn create_stack(
        &self,
        creds: &BootstrapCredentials,
        stack_name: &str,
        template_body: &str,
        parameters: &HashMap<String, String>,
    ) -> LocusResult<String> {
        self.stacks
            .create_stack(creds, stack_name, template_body, parameters)
            .await
    }

    async fn describe_stack(
        &self,
        creds: &BootstrapCredentials,
        stack_name: &str,
    ) -> LocusResult<StackDetails> {
        self.stacks.describe_stack(creds, stack_name).await
    }

    async fn describe_stack_events(
        &self,
        creds: &BootstrapCredentials,
        stack_name: &str,
    ) -> LocusResult<Vec<StackEvent>> {
        self.stacks.describe_stack_events(creds, stack_name).await
    }
}

#[async_trait]
impl BucketDirectoryEffects for LocusEffectSystem {
    async fn list_buckets(&self, creds: &BootstrapCredentials) -> LocusResult<Vec<String>> {
        self.buckets.list_buckets(creds).await
    }

    async fn get_bucket_tags(
        &self,
        creds: &BootstrapCredentials,
        bucket_name: &str,
    ) -> LocusResult<HashMap<String, String>> {
        self.buckets.get_bucket_tags(creds, bucket_name).await
    }
}

#[async_trait]
impl ResourceLoaderEffects for LocusEffectSystem {
    async fn stack_template(&self) -> LocusResult<String> {
        self.templates.stack_template().await
    }
}

#[async_trait]
impl ConfigurationEffects for LocusEffectSystem {
    async fn initialize_identity(&self, device_id: &str, salt: &str) -> Result<(), StorageError> {
        self.identity.initialize_identity(device_id, salt).await
    }

    async fn device_id(&self) -> Result<Option<String>, StorageError> {
        self.identity.device_id().await
    }

    async fn telemetry_salt(&self) -> Result<Option<String>, StorageError> {
        self.identity.telemetry_salt().await
    }
}
