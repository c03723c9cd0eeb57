//! New-device provisioning
//!
//! Deploys a fresh stack for a named device, turns its outputs into runtime
//! credentials, records a new device identity and promotes.

use crate::outputs::RuntimeOutputs;
use crate::repository::CredentialRepository;
use crate::stack_service::{PollSettings, StackCreatedCallback, StackProvisioningService};
use locus_core::effects::ProvisioningEffects;
use locus_core::identity::{generate_device_id, generate_salt};
use locus_core::stack::{stack_name_for, PARAM_STACK_NAME};
use locus_core::{
    AuthError, BootstrapCredentials, DomainError, LocusResult, ProvisioningError,
    ProvisioningSettings, ProvisioningState,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

pub struct ProvisioningOrchestrator<E> {
    effects: Arc<E>,
    repository: Arc<CredentialRepository>,
    stacks: StackProvisioningService<E>,
    stack_name_prefix: String,
}

impl<E: ProvisioningEffects> ProvisioningOrchestrator<E> {
    pub fn new(
        effects: Arc<E>,
        repository: Arc<CredentialRepository>,
        settings: &ProvisioningSettings,
    ) -> Self {
        let stacks =
            StackProvisioningService::new(effects.clone(), repository.clone(), settings.into());
        Self {
            effects,
            repository,
            stacks,
            stack_name_prefix: settings.stack_name_prefix.clone(),
        }
    }

    /// Override the polling cadence (tests and the worker's config).
    pub fn with_poll_settings(mut self, settings: PollSettings) -> Self {
        self.stacks = StackProvisioningService::new(
            self.effects.clone(),
            self.repository.clone(),
            settings,
        );
        self
    }

    /// Provision `device_name` with `creds`.
    ///
    /// Returns only after runtime credentials are persisted and the
    /// bootstrap record is gone.
    pub async fn invoke(&self, creds: &BootstrapCredentials, device_name: &str) -> LocusResult<()> {
        self.invoke_tracked(creds, device_name, &|_| {}).await
    }

    /// [`invoke`](Self::invoke), reporting the stack id once the stack exists.
    ///
    /// The name is used as given; only an all-whitespace name is rejected.
    pub async fn invoke_tracked(
        &self,
        creds: &BootstrapCredentials,
        device_name: &str,
        on_stack_created: StackCreatedCallback<'_>,
    ) -> LocusResult<()> {
        if device_name.trim().is_empty() {
            return Err(AuthError::InvalidCredentials.into());
        }

        let template = self
            .effects
            .stack_template()
            .await
            .map_err(|err| self.fail(as_invalid_configuration(err)))?;

        let stack_name = stack_name_for(&self.stack_name_prefix, device_name);
        let parameters = HashMap::from([(PARAM_STACK_NAME.to_string(), device_name.to_string())]);
        info!(device_name, %stack_name, "provisioning new device");

        let publish = |line: &str| {
            self.repository
                .update_provisioning_state(ProvisioningState::working(line));
        };
        let result = self
            .stacks
            .create_and_track_stack(
                creds,
                &stack_name,
                &template,
                &parameters,
                &publish,
                on_stack_created,
            )
            .await?;

        let (outputs, bucket_name) = RuntimeOutputs::parse_with_bucket(&result).map_err(|err| {
            warn!(%stack_name, "stack finished with unusable outputs");
            self.fail(err)
        })?;

        publish("Finalizing setup...");

        let device_id = generate_device_id(self.effects.as_ref()).await;
        let salt = generate_salt(self.effects.as_ref()).await;
        self.effects
            .initialize_identity(&device_id, &salt)
            .await
            .map_err(|err| self.fail(DomainError::auth(err)))?;

        let runtime =
            outputs.into_runtime_credentials(bucket_name, creds.region.clone(), salt);
        self.repository
            .promote_to_runtime_credentials(&runtime)
            .await
            .map_err(|err| self.fail(err))?;

        info!(device_name, %device_id, bucket = %runtime.bucket_name, "device provisioned");
        Ok(())
    }

    fn fail(&self, err: DomainError) -> DomainError {
        self.repository
            .update_provisioning_state(ProvisioningState::failure(err.clone()));
        err
    }
}

/// Template loading failures surface as configuration errors.
pub(crate) fn as_invalid_configuration(err: DomainError) -> DomainError {
    match err {
        DomainError::Provisioning(ProvisioningError::InvalidConfiguration { .. }) => err,
        other => DomainError::invalid_configuration(other.to_string()),
    }
}
