//! Credential repository
//!
//! Sole owner of the persisted credential records and of the two observable
//! state streams. Orchestrators are transient and talk to the repository;
//! observers hold `watch::Receiver`s and never write.

use locus_core::effects::{CredentialStoreEffects, StorageError};
use locus_core::{
    AuthError, AuthState, BootstrapCredentials, DomainError, LocusResult, OnboardingStage,
    ProvisioningState, RuntimeCredentials,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

pub struct CredentialRepository {
    store: Arc<dyn CredentialStoreEffects>,
    auth_tx: watch::Sender<AuthState>,
    provisioning_tx: watch::Sender<ProvisioningState>,
}

impl CredentialRepository {
    /// Repository over `store`, starting `Uninitialized` and `Idle`.
    ///
    /// Call [`initialize`](Self::initialize) to derive the real auth state
    /// from what is on disk.
    pub fn new(store: Arc<dyn CredentialStoreEffects>) -> Self {
        let (auth_tx, _) = watch::channel(AuthState::Uninitialized);
        let (provisioning_tx, _) = watch::channel(ProvisioningState::Idle);
        Self {
            store,
            auth_tx,
            provisioning_tx,
        }
    }

    /// Derive `AuthState` from the persisted records.
    ///
    /// A record that exists but cannot be read is an error; it is never
    /// treated as absent.
    pub async fn initialize(&self) -> LocusResult<AuthState> {
        let state = if self.store.load_runtime().await.map_err(storage_error)?.is_some() {
            AuthState::Authenticated
        } else if self
            .store
            .load_bootstrap()
            .await
            .map_err(storage_error)?
            .is_some()
        {
            AuthState::SetupPending
        } else {
            AuthState::Uninitialized
        };

        info!(?state, "credential repository initialized");
        self.auth_tx.send_replace(state);
        Ok(state)
    }

    pub fn auth_state(&self) -> watch::Receiver<AuthState> {
        self.auth_tx.subscribe()
    }

    pub fn provisioning_state(&self) -> watch::Receiver<ProvisioningState> {
        self.provisioning_tx.subscribe()
    }

    pub fn current_auth_state(&self) -> AuthState {
        *self.auth_tx.borrow()
    }

    pub fn current_provisioning_state(&self) -> ProvisioningState {
        self.provisioning_tx.borrow().clone()
    }

    /// Publish `next`, applying the history rules of
    /// [`ProvisioningState::transition`] in one atomic channel update.
    pub fn update_provisioning_state(&self, next: ProvisioningState) {
        self.provisioning_tx.send_modify(|state| {
            *state = state.transition(next);
        });
        debug!(state = ?self.provisioning_tx.borrow(), "provisioning state updated");
    }

    /// Publish `state` verbatim, bypassing the history rules.
    ///
    /// For flows that keep their own step log and mirror it into each state.
    pub fn replace_provisioning_state(&self, state: ProvisioningState) {
        debug!(?state, "provisioning state replaced");
        self.provisioning_tx.send_replace(state);
    }

    pub async fn save_bootstrap_credentials(&self, creds: &BootstrapCredentials) -> LocusResult<()> {
        creds.validate()?;
        self.store
            .save_bootstrap(creds)
            .await
            .map_err(storage_error)?;
        info!(access_key_id = %creds.access_key_id, "bootstrap credentials saved");
        self.auth_tx.send_replace(AuthState::SetupPending);
        Ok(())
    }

    pub async fn get_bootstrap_credentials(&self) -> LocusResult<BootstrapCredentials> {
        self.store
            .load_bootstrap()
            .await
            .map_err(storage_error)?
            .ok_or_else(|| AuthError::InvalidCredentials.into())
    }

    pub async fn clear_bootstrap_credentials(&self) -> LocusResult<()> {
        self.store.clear_bootstrap().await.map_err(storage_error)
    }

    /// Persist runtime credentials, destroy the bootstrap record, then flip
    /// to `Authenticated` and publish `Success`.
    ///
    /// If the bootstrap record cannot be cleared the error is returned and
    /// the auth state is left untouched.
    pub async fn promote_to_runtime_credentials(&self, creds: &RuntimeCredentials) -> LocusResult<()> {
        self.store.save_runtime(creds).await.map_err(storage_error)?;
        self.store.clear_bootstrap().await.map_err(storage_error)?;

        info!(bucket = %creds.bucket_name, "runtime credentials promoted");
        self.auth_tx.send_replace(AuthState::Authenticated);
        self.update_provisioning_state(ProvisioningState::success());
        Ok(())
    }

    pub async fn replace_runtime_credentials(&self, creds: &RuntimeCredentials) -> LocusResult<()> {
        self.store.save_runtime(creds).await.map_err(storage_error)?;
        info!(bucket = %creds.bucket_name, "runtime credentials replaced");
        self.auth_tx.send_replace(AuthState::Authenticated);
        Ok(())
    }

    pub async fn get_runtime_credentials(&self) -> LocusResult<RuntimeCredentials> {
        self.store
            .load_runtime()
            .await
            .map_err(storage_error)?
            .ok_or_else(|| AuthError::InvalidCredentials.into())
    }

    /// Persisted onboarding stage.
    ///
    /// Never fails: an absent record reads as `Idle`, and an unreadable one
    /// falls back to a stage consistent with the current auth state.
    pub async fn onboarding_stage(&self) -> OnboardingStage {
        match self.store.load_onboarding_stage().await {
            Ok(Some(stage)) => stage,
            Ok(None) => OnboardingStage::Idle,
            Err(err) => {
                let fallback = if self.current_auth_state() == AuthState::Authenticated {
                    OnboardingStage::PermissionsPending
                } else {
                    OnboardingStage::Idle
                };
                warn!(error = %err, ?fallback, "onboarding stage unreadable, using fallback");
                fallback
            }
        }
    }

    pub async fn set_onboarding_stage(&self, stage: OnboardingStage) -> LocusResult<()> {
        self.store
            .save_onboarding_stage(stage)
            .await
            .map_err(storage_error)
    }
}

impl std::fmt::Debug for CredentialRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRepository")
            .field("auth_state", &*self.auth_tx.borrow())
            .finish_non_exhaustive()
    }
}

pub(crate) fn storage_error(err: StorageError) -> DomainError {
    error!(error = %err, "secure storage failure");
    AuthError::Generic {
        cause: format!("Secure storage unavailable or corrupted: {err}"),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use locus_testkit::stores::StoreOp;
    use locus_testkit::{bootstrap_credentials, runtime_credentials, MemoryCredentialStore};

    fn repository() -> (CredentialRepository, MemoryCredentialStore) {
        let store = MemoryCredentialStore::new();
        (CredentialRepository::new(Arc::new(store.clone())), store)
    }

    #[tokio::test]
    async fn test_initialize_derives_auth_state() {
        let (repo, store) = repository();
        assert_eq!(repo.initialize().await.unwrap(), AuthState::Uninitialized);

        store.seed_bootstrap(bootstrap_credentials());
        assert_eq!(repo.initialize().await.unwrap(), AuthState::SetupPending);

        store.seed_runtime(runtime_credentials());
        assert_eq!(repo.initialize().await.unwrap(), AuthState::Authenticated);
        assert_eq!(*repo.auth_state().borrow(), AuthState::Authenticated);
    }

    #[tokio::test]
    async fn test_initialize_fails_on_corrupted_store() {
        let (repo, store) = repository();
        store.seed_runtime(runtime_credentials());
        store.corrupt(StoreOp::LoadRuntime);

        assert_matches!(
            repo.initialize().await,
            Err(DomainError::Auth(AuthError::Generic { cause })) if cause.starts_with("Secure storage unavailable or corrupted")
        );
        assert_eq!(repo.current_auth_state(), AuthState::Uninitialized);
    }

    #[tokio::test]
    async fn test_save_bootstrap_moves_to_setup_pending() {
        let (repo, store) = repository();
        let mut auth = repo.auth_state();

        repo.save_bootstrap_credentials(&bootstrap_credentials()).await.unwrap();

        assert!(auth.has_changed().unwrap());
        assert_eq!(*auth.borrow_and_update(), AuthState::SetupPending);
        assert_eq!(store.bootstrap(), Some(bootstrap_credentials()));
        assert_eq!(
            repo.get_bootstrap_credentials().await.unwrap(),
            bootstrap_credentials()
        );
    }

    #[tokio::test]
    async fn test_save_bootstrap_failure_keeps_state() {
        let (repo, store) = repository();
        store.fail_on(StoreOp::SaveBootstrap);

        assert!(repo
            .save_bootstrap_credentials(&bootstrap_credentials())
            .await
            .is_err());
        assert_eq!(repo.current_auth_state(), AuthState::Uninitialized);
    }

    #[tokio::test]
    async fn test_missing_credentials_are_invalid() {
        let (repo, _store) = repository();
        assert_matches!(
            repo.get_bootstrap_credentials().await,
            Err(DomainError::Auth(AuthError::InvalidCredentials))
        );
        assert_matches!(
            repo.get_runtime_credentials().await,
            Err(DomainError::Auth(AuthError::InvalidCredentials))
        );
    }

    #[tokio::test]
    async fn test_promote_clears_bootstrap_and_authenticates() {
        let (repo, store) = repository();
        repo.save_bootstrap_credentials(&bootstrap_credentials()).await.unwrap();
        repo.update_provisioning_state(ProvisioningState::working("Deploying"));

        repo.promote_to_runtime_credentials(&runtime_credentials())
            .await
            .unwrap();

        assert_eq!(store.bootstrap(), None);
        assert_eq!(store.runtime(), Some(runtime_credentials()));
        assert_eq!(repo.current_auth_state(), AuthState::Authenticated);
        assert_eq!(
            repo.current_provisioning_state(),
            ProvisioningState::Success {
                history: vec!["Deploying".to_string()]
            }
        );
    }

    #[tokio::test]
    async fn test_promote_surfaces_failed_clear() {
        let (repo, store) = repository();
        repo.save_bootstrap_credentials(&bootstrap_credentials()).await.unwrap();
        store.fail_on(StoreOp::ClearBootstrap);

        assert_matches!(
            repo.promote_to_runtime_credentials(&runtime_credentials()).await,
            Err(DomainError::Auth(AuthError::Generic { .. }))
        );
        assert_eq!(repo.current_auth_state(), AuthState::SetupPending);
        assert_eq!(repo.current_provisioning_state(), ProvisioningState::Idle);
    }

    #[tokio::test]
    async fn test_replace_runtime_stays_authenticated() {
        let (repo, store) = repository();
        store.seed_runtime(runtime_credentials());
        repo.initialize().await.unwrap();

        let mut rotated = runtime_credentials();
        rotated.access_key_id = "AKIA2".to_string();
        repo.replace_runtime_credentials(&rotated).await.unwrap();

        assert_eq!(repo.current_auth_state(), AuthState::Authenticated);
        assert_eq!(repo.get_runtime_credentials().await.unwrap().access_key_id, "AKIA2");
    }

    #[tokio::test]
    async fn test_observers_see_history_in_order() {
        let (repo, _store) = repository();
        let observer = repo.provisioning_state();

        repo.update_provisioning_state(ProvisioningState::working("one"));
        repo.update_provisioning_state(ProvisioningState::working("two"));
        repo.update_provisioning_state(ProvisioningState::working("three"));

        assert_eq!(
            *observer.borrow(),
            ProvisioningState::Working {
                current_step: "three".to_string(),
                history: vec!["one".to_string(), "two".to_string()],
            }
        );
    }

    #[tokio::test]
    async fn test_onboarding_stage_round_trip_and_fallback() {
        let (repo, store) = repository();
        assert_eq!(repo.onboarding_stage().await, OnboardingStage::Idle);

        repo.set_onboarding_stage(OnboardingStage::Provisioning).await.unwrap();
        assert_eq!(repo.onboarding_stage().await, OnboardingStage::Provisioning);

        store.corrupt(StoreOp::LoadStage);
        assert_eq!(repo.onboarding_stage().await, OnboardingStage::Idle);

        store.seed_runtime(runtime_credentials());
        store.heal();
        repo.initialize().await.unwrap();
        store.corrupt(StoreOp::LoadStage);
        assert_eq!(
            repo.onboarding_stage().await,
            OnboardingStage::PermissionsPending
        );
    }
}
