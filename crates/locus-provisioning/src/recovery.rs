//! Existing-bucket recovery
//!
//! Adopts a bucket created by an earlier Locus install. The bucket must
//! carry the CloudFormation stack-name tag; a new stack is deployed under a
//! fresh device id to mint credentials scoped to that bucket.

use crate::outputs::RuntimeOutputs;
use crate::provisioning::as_invalid_configuration;
use crate::repository::CredentialRepository;
use crate::stack_service::{PollSettings, StackCreatedCallback, StackProvisioningService};
use locus_core::effects::RecoveryEffects;
use locus_core::identity::{generate_device_id, generate_salt};
use locus_core::stack::{stack_name_for, PARAM_BUCKET_NAME, PARAM_STACK_NAME, TAG_STACK_NAME};
use locus_core::{
    BootstrapCredentials, DomainError, LocusResult, ProgressLog, ProvisioningSettings,
    ProvisioningState, RecoveryError,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

pub struct RecoveryOrchestrator<E> {
    effects: Arc<E>,
    repository: Arc<CredentialRepository>,
    stacks: StackProvisioningService<E>,
    stack_name_prefix: String,
}

impl<E: RecoveryEffects> RecoveryOrchestrator<E> {
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

    pub fn with_poll_settings(mut self, settings: PollSettings) -> Self {
        self.stacks = StackProvisioningService::new(
            self.effects.clone(),
            self.repository.clone(),
            settings,
        );
        self
    }

    /// Recover access to `bucket_name`.
    ///
    /// The final `Success` carries this run's own step log, independent of
    /// whatever the stream showed before the run started.
    pub async fn invoke(&self, creds: &BootstrapCredentials, bucket_name: &str) -> LocusResult<()> {
        self.invoke_tracked(creds, bucket_name, &|_| {}).await
    }

    /// [`invoke`](Self::invoke), reporting the stack id once the stack exists.
    pub async fn invoke_tracked(
        &self,
        creds: &BootstrapCredentials,
        bucket_name: &str,
        on_stack_created: StackCreatedCallback<'_>,
    ) -> LocusResult<()> {
        let run = RecoveryRun::new(&self.repository);

        run.step("Validating bucket ownership...");
        let tags = self
            .effects
            .get_bucket_tags(creds, bucket_name)
            .await
            .map_err(|err| {
                warn!(bucket_name, error = %err, "bucket tags unreadable");
                run.fail(RecoveryError::MissingStackTag.into())
            })?;
        let tagged = tags
            .get(TAG_STACK_NAME)
            .is_some_and(|stack| !stack.trim().is_empty());
        if !tagged {
            warn!(bucket_name, "bucket has no stack-name tag");
            return Err(run.fail(RecoveryError::MissingStackTag.into()));
        }

        run.step("Loading template...");
        let template = self
            .effects
            .stack_template()
            .await
            .map_err(|err| run.fail(as_invalid_configuration(err)))?;

        let device_id = generate_device_id(self.effects.as_ref()).await;
        let stack_name = stack_name_for(&self.stack_name_prefix, &device_id);
        let parameters = HashMap::from([
            (PARAM_BUCKET_NAME.to_string(), bucket_name.to_string()),
            (PARAM_STACK_NAME.to_string(), device_id.clone()),
        ]);
        info!(bucket_name, %stack_name, "recovering existing bucket");

        let publish = |line: &str| run.step(line);
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

        let outputs = RuntimeOutputs::parse(&result).map_err(|err| run.fail(err))?;
        run.step("Finalizing setup...");

        let salt = generate_salt(self.effects.as_ref()).await;
        self.effects
            .initialize_identity(&device_id, &salt)
            .await
            .map_err(|err| run.fail(DomainError::auth(err)))?;

        let runtime =
            outputs.into_runtime_credentials(bucket_name.to_string(), creds.region.clone(), salt);
        self.repository
            .promote_to_runtime_credentials(&runtime)
            .await
            .map_err(|err| run.fail(err))?;

        run.succeed();
        info!(bucket_name, %device_id, "bucket recovered");
        Ok(())
    }
}

/// Step log for one recovery attempt, mirrored into each published state.
struct RecoveryRun<'a> {
    repository: &'a CredentialRepository,
    log: Mutex<ProgressLog>,
}

impl<'a> RecoveryRun<'a> {
    fn new(repository: &'a CredentialRepository) -> Self {
        Self {
            repository,
            log: Mutex::new(ProgressLog::new()),
        }
    }

    fn step(&self, line: &str) {
        let history = {
            let mut log = self.log.lock();
            let history = log.to_vec();
            log.push(line);
            history
        };
        self.repository
            .replace_provisioning_state(ProvisioningState::Working {
                current_step: line.to_string(),
                history,
            });
    }

    fn fail(&self, error: DomainError) -> DomainError {
        self.repository
            .replace_provisioning_state(ProvisioningState::Failure {
                error: error.clone(),
                history: self.log.lock().to_vec(),
            });
        error
    }

    fn succeed(&self) {
        self.repository
            .replace_provisioning_state(ProvisioningState::Success {
                history: self.log.lock().to_vec(),
            });
    }
}
