//! Assembled test effect system
//!
//! `TestEffects` wires every fake into a `LocusEffectSystem` and keeps a
//! handle to each one so tests can script responses and inspect calls.

use crate::cloud::{FakeBucketDirectory, ScriptedStackLifecycle};
use crate::random::SeededRandom;
use crate::stores::{MemoryCredentialStore, RecordingIdentityStore};
use crate::templates::StaticTemplateLoader;
use crate::time::SimulatedClock;
use locus_effects::{EncryptedStorage, EncryptedStorageConfig, LocusEffectSystem, MemoryStorageHandler};
use std::sync::Arc;

pub struct TestEffects {
    pub system: Arc<LocusEffectSystem>,
    pub stacks: ScriptedStackLifecycle,
    pub buckets: FakeBucketDirectory,
    pub clock: SimulatedClock,
    pub random: SeededRandom,
    pub identity: RecordingIdentityStore,
    pub credentials: MemoryCredentialStore,
    /// Raw blob store behind the system's encrypted storage
    pub storage: MemoryStorageHandler,
}

impl TestEffects {
    pub fn builder() -> TestEffectsBuilder {
        TestEffectsBuilder::default()
    }

    /// Default fakes: empty scripts, seed 42, a trivial template.
    pub fn new() -> Self {
        Self::builder().build()
    }
}

impl Default for TestEffects {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
pub struct TestEffectsBuilder {
    seed: Option<u64>,
    start_ms: Option<u64>,
    template: Option<StaticTemplateLoader>,
    stacks: Option<ScriptedStackLifecycle>,
    buckets: Option<FakeBucketDirectory>,
    credentials: Option<MemoryCredentialStore>,
    plaintext_storage: bool,
}

impl TestEffectsBuilder {
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn start_ms(mut self, start_ms: u64) -> Self {
        self.start_ms = Some(start_ms);
        self
    }

    pub fn template(mut self, template: StaticTemplateLoader) -> Self {
        self.template = Some(template);
        self
    }

    pub fn stacks(mut self, stacks: ScriptedStackLifecycle) -> Self {
        self.stacks = Some(stacks);
        self
    }

    pub fn buckets(mut self, buckets: FakeBucketDirectory) -> Self {
        self.buckets = Some(buckets);
        self
    }

    pub fn credentials(mut self, credentials: MemoryCredentialStore) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Leave records unencrypted so tests can read the raw blobs.
    pub fn plaintext_storage(mut self) -> Self {
        self.plaintext_storage = true;
        self
    }

    pub fn build(self) -> TestEffects {
        let random = SeededRandom::new(self.seed.unwrap_or(42));
        let clock = self
            .start_ms
            .map(SimulatedClock::new)
            .unwrap_or_default();
        let stacks = self.stacks.unwrap_or_default();
        let buckets = self.buckets.unwrap_or_default();
        let credentials = self.credentials.unwrap_or_default();
        let identity = RecordingIdentityStore::new();
        let storage = MemoryStorageHandler::new();

        let config = if self.plaintext_storage {
            EncryptedStorageConfig::plaintext()
        } else {
            EncryptedStorageConfig::default()
        };
        let encrypted = EncryptedStorage::new(
            storage.clone(),
            MemoryStorageHandler::new(),
            Arc::new(random.clone()),
            config,
        );

        let system = LocusEffectSystem::builder()
            .with_time(Arc::new(clock.clone()))
            .with_random(Arc::new(random.clone()))
            .with_stack_lifecycle(Arc::new(stacks.clone()))
            .with_bucket_directory(Arc::new(buckets.clone()))
            .with_template_loader(Arc::new(self.template.unwrap_or_default()))
            .with_identity_store(Arc::new(identity.clone()))
            .with_credential_store(Arc::new(credentials.clone()))
            .with_storage(Arc::new(encrypted))
            .build()
            .expect("all test components are provided");

        TestEffects {
            system: Arc::new(system),
            stacks,
            buckets,
            clock,
            random,
            identity,
            credentials,
            storage,
        }
    }
}
