//! Shared harness for the provisioning integration tests.

#![allow(dead_code)]

use locus_core::LocusConfig;
use locus_effects::LocusEffectSystem;
use locus_provisioning::{
    CredentialRepository, ProvisioningOrchestrator, ProvisioningWorker, RecoveryOrchestrator,
};
use locus_testkit::{bootstrap_credentials, TestEffects};
use std::sync::Arc;

pub const DEVICE_NAME: &str = "pixel-7";
pub const DEVICE_STACK: &str = "locus-user-pixel-7";

pub struct Harness {
    pub effects: TestEffects,
    pub repository: Arc<CredentialRepository>,
    pub config: LocusConfig,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_effects(TestEffects::new())
    }

    pub fn with_effects(effects: TestEffects) -> Self {
        locus_testkit::init_tracing();
        let repository = Arc::new(CredentialRepository::new(Arc::new(
            effects.credentials.clone(),
        )));
        Self {
            effects,
            repository,
            config: LocusConfig::default(),
        }
    }

    /// Harness whose repository already holds bootstrap credentials.
    pub async fn with_bootstrap() -> Self {
        let harness = Self::new();
        harness
            .repository
            .save_bootstrap_credentials(&bootstrap_credentials())
            .await
            .unwrap();
        harness
    }

    pub fn provisioning(&self) -> ProvisioningOrchestrator<LocusEffectSystem> {
        ProvisioningOrchestrator::new(
            self.effects.system.clone(),
            self.repository.clone(),
            &self.config.provisioning,
        )
    }

    pub fn recovery(&self) -> RecoveryOrchestrator<LocusEffectSystem> {
        RecoveryOrchestrator::new(
            self.effects.system.clone(),
            self.repository.clone(),
            &self.config.provisioning,
        )
    }

    pub fn worker(&self) -> ProvisioningWorker<LocusEffectSystem> {
        ProvisioningWorker::new(
            self.effects.system.clone(),
            self.effects.system.storage(),
            self.repository.clone(),
            &self.config,
        )
    }

    pub fn history(&self) -> Vec<String> {
        self.repository
            .current_provisioning_state()
            .history()
            .to_vec()
    }
}
