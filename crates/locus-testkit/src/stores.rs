//! In-memory stores with failure injection
//!
//! Both stores count mutating calls so tests can assert that an operation
//! performed no writes at all.

use async_trait::async_trait;
use locus_core::effects::{ConfigurationEffects, CredentialStoreEffects, StorageError};
use locus_core::{BootstrapCredentials, OnboardingStage, RuntimeCredentials};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// Operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    SaveBootstrap,
    LoadBootstrap,
    ClearBootstrap,
    SaveRuntime,
    LoadRuntime,
    ClearRuntime,
    SaveStage,
    LoadStage,
}

#[derive(Debug, Default)]
struct CredentialRecords {
    bootstrap: Option<BootstrapCredentials>,
    runtime: Option<RuntimeCredentials>,
    stage: Option<OnboardingStage>,
    failing: HashSet<StoreOp>,
    corrupted: HashSet<StoreOp>,
    writes: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    records: Arc<Mutex<CredentialRecords>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `op` fail with `StorageError::WriteFailed`/`ReadFailed`.
    pub fn fail_on(&self, op: StoreOp) {
        self.records.lock().failing.insert(op);
    }

    /// Make a load report `StorageError::DecryptionFailed`.
    pub fn corrupt(&self, op: StoreOp) {
        self.records.lock().corrupted.insert(op);
    }

    pub fn heal(&self) {
        let mut records = self.records.lock();
        records.failing.clear();
        records.corrupted.clear();
    }

    /// Seed records without counting as writes.
    pub fn seed_bootstrap(&self, creds: BootstrapCredentials) {
        self.records.lock().bootstrap = Some(creds);
    }

    pub fn seed_runtime(&self, creds: RuntimeCredentials) {
        self.records.lock().runtime = Some(creds);
    }

    pub fn seed_stage(&self, stage: OnboardingStage) {
        self.records.lock().stage = Some(stage);
    }

    pub fn bootstrap(&self) -> Option<BootstrapCredentials> {
        self.records.lock().bootstrap.clone()
    }

    pub fn runtime(&self) -> Option<RuntimeCredentials> {
        self.records.lock().runtime.clone()
    }

    pub fn write_count(&self) -> usize {
        self.records.lock().writes
    }

    fn check(&self, op: StoreOp) -> Result<(), StorageError> {
        let records = self.records.lock();
        if records.corrupted.contains(&op) {
            return Err(StorageError::DecryptionFailed {
                reason: format!("injected corruption on {op:?}"),
            });
        }
        if records.failing.contains(&op) {
            let reason = format!("injected failure on {op:?}");
            return Err(match op {
                StoreOp::LoadBootstrap | StoreOp::LoadRuntime | StoreOp::LoadStage => {
                    StorageError::ReadFailed { reason }
                }
                StoreOp::ClearBootstrap | StoreOp::ClearRuntime => {
                    StorageError::DeleteFailed { reason }
                }
                _ => StorageError::WriteFailed { reason },
            });
        }
        Ok(())
    }

    fn write<F: FnOnce(&mut CredentialRecords)>(&self, op: StoreOp, f: F) -> Result<(), StorageError> {
        self.check(op)?;
        let mut records = self.records.lock();
        records.writes += 1;
        f(&mut *records);
        Ok(())
    }
}

#[async_trait]
impl CredentialStoreEffects for MemoryCredentialStore {
    async fn save_bootstrap(&self, creds: &BootstrapCredentials) -> Result<(), StorageError> {
        self.write(StoreOp::SaveBootstrap, |r| r.bootstrap = Some(creds.clone()))
    }

    async fn load_bootstrap(&self) -> Result<Option<BootstrapCredentials>, StorageError> {
        self.check(StoreOp::LoadBootstrap)?;
        Ok(self.bootstrap())
    }

    async fn clear_bootstrap(&self) -> Result<(), StorageError> {
        self.write(StoreOp::ClearBootstrap, |r| r.bootstrap = None)
    }

    async fn save_runtime(&self, creds: &RuntimeCredentials) -> Result<(), StorageError> {
        self.write(StoreOp::SaveRuntime, |r| r.runtime = Some(creds.clone()))
    }

    async fn load_runtime(&self) -> Result<Option<RuntimeCredentials>, StorageError> {
        self.check(StoreOp::LoadRuntime)?;
        Ok(self.runtime())
    }

    async fn clear_runtime(&self) -> Result<(), StorageError> {
        self.write(StoreOp::ClearRuntime, |r| r.runtime = None)
    }

    async fn save_onboarding_stage(&self, stage: OnboardingStage) -> Result<(), StorageError> {
        self.write(StoreOp::SaveStage, |r| r.stage = Some(stage))
    }

    async fn load_onboarding_stage(&self) -> Result<Option<OnboardingStage>, StorageError> {
        self.check(StoreOp::LoadStage)?;
        Ok(self.records.lock().stage)
    }
}

#[derive(Debug, Default)]
struct IdentityRecords {
    initialized: Vec<(String, String)>,
    fail: bool,
}

/// Identity store that records every `initialize_identity` call.
#[derive(Debug, Clone, Default)]
pub struct RecordingIdentityStore {
    records: Arc<Mutex<IdentityRecords>>,
}

impl RecordingIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self) {
        self.records.lock().fail = true;
    }

    /// `(device_id, salt)` pairs in call order.
    pub fn initialized(&self) -> Vec<(String, String)> {
        self.records.lock().initialized.clone()
    }

    pub fn write_count(&self) -> usize {
        self.records.lock().initialized.len()
    }
}

#[async_trait]
impl ConfigurationEffects for RecordingIdentityStore {
    async fn initialize_identity(&self, device_id: &str, salt: &str) -> Result<(), StorageError> {
        let mut records = self.records.lock();
        if records.fail {
            return Err(StorageError::WriteFailed {
                reason: "injected identity failure".to_string(),
            });
        }
        records
            .initialized
            .push((device_id.to_string(), salt.to_string()));
        Ok(())
    }

    async fn device_id(&self) -> Result<Option<String>, StorageError> {
        Ok(self.records.lock().initialized.last().map(|(id, _)| id.clone()))
    }

    async fn telemetry_salt(&self) -> Result<Option<String>, StorageError> {
        Ok(self
            .records
            .lock()
            .initialized
            .last()
            .map(|(_, salt)| salt.clone()))
    }
}
