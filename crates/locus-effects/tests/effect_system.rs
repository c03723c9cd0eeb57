//! Wiring of the composite effect system over on-disk encrypted storage.

use assert_matches::assert_matches;
use async_trait::async_trait;
use locus_core::effects::{
    BucketDirectoryEffects, ConfigurationEffects, CredentialStoreEffects, ResourceLoaderEffects,
    StackLifecycleEffects,
};
use locus_core::{BootstrapCredentials, LocusConfig, LocusResult, StackDetails};
use locus_effects::{open_encrypted_store, EffectSystemError, LocusEffectSystem};
use std::collections::HashMap;
use std::sync::Arc;

struct StaticCloud;

#[async_trait]
impl StackLifecycleEffects for StaticCloud {
    async fn create_stack(
        &self,
        _creds: &BootstrapCredentials,
        stack_name: &str,
        _template_body: &str,
        _parameters: &HashMap<String, String>,
    ) -> LocusResult<String> {
        Ok(format!("arn:aws:cloudformation:us-east-1:123456789012:stack/{stack_name}/1"))
    }

    async fn describe_stack(
        &self,
        _creds: &BootstrapCredentials,
        _stack_name: &str,
    ) -> LocusResult<StackDetails> {
        Ok(StackDetails::new("CREATE_IN_PROGRESS"))
    }
}

#[async_trait]
impl BucketDirectoryEffects for StaticCloud {
    async fn list_buckets(&self, _creds: &BootstrapCredentials) -> LocusResult<Vec<String>> {
        Ok(vec!["locus-a".to_string()])
    }

    async fn get_bucket_tags(
        &self,
        _creds: &BootstrapCredentials,
        _bucket_name: &str,
    ) -> LocusResult<HashMap<String, String>> {
        Ok(HashMap::new())
    }
}

fn creds() -> BootstrapCredentials {
    BootstrapCredentials::new("AKIA", "secret", "token", "us-east-1")
}

#[test]
fn build_requires_cloud_handlers_and_storage() {
    assert_matches!(
        LocusEffectSystem::builder().build(),
        Err(EffectSystemError::MissingComponent("stack_lifecycle"))
    );
    assert_matches!(
        LocusEffectSystem::builder()
            .with_stack_lifecycle(Arc::new(StaticCloud))
            .with_bucket_directory(Arc::new(StaticCloud))
            .build(),
        Err(EffectSystemError::MissingComponent("storage"))
    );
}

#[tokio::test]
async fn records_persist_across_systems() {
    let dir = tempfile::tempdir().unwrap();
    let build = || {
        LocusEffectSystem::builder()
            .with_stack_lifecycle(Arc::new(StaticCloud))
            .with_bucket_directory(Arc::new(StaticCloud))
            .with_storage(open_encrypted_store(dir.path()).unwrap())
            .build()
            .unwrap()
    };

    let first = build();
    first.credential_store().save_bootstrap(&creds()).await.unwrap();
    first.initialize_identity("device-1", "ab").await.unwrap();
    assert_eq!(first.list_buckets(&creds()).await.unwrap(), vec!["locus-a"]);

    let second = build();
    assert_eq!(second.credential_store().load_bootstrap().await.unwrap(), Some(creds()));
    assert_eq!(second.device_id().await.unwrap().as_deref(), Some("device-1"));
}

#[tokio::test]
async fn config_template_override_is_used() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("custom.yaml");
    std::fs::write(&template, "Resources: {}\n").unwrap();

    let mut config = LocusConfig::default();
    config.storage.template_path = Some(template);

    let system = LocusEffectSystem::builder()
        .with_config(&config)
        .with_stack_lifecycle(Arc::new(StaticCloud))
        .with_bucket_directory(Arc::new(StaticCloud))
        .with_storage(open_encrypted_store(&dir.path().join("data")).unwrap())
        .build()
        .unwrap();

    assert_eq!(system.stack_template().await.unwrap(), "Resources: {}\n");
    let events = system.describe_stack_events(&creds(), "s").await.unwrap();
    assert!(events.is_empty());
}
