//! Durable provisioning worker
//!
//! A provisioning attempt can outlive the process that started it, so the
//! request is persisted as a job record before anything runs. The worker runs
//! at most one attempt at a time, classifies failures into retry or fatal,
//! and reconciles the published state with the job record after a restart.
//!
//! Only failures that happen before a stack exists are retried. Once the
//! provider has accepted a stack, every later failure is terminal: another
//! attempt would deploy a second stack next to one that may still be running.

use crate::provisioning::ProvisioningOrchestrator;
use crate::recovery::RecoveryOrchestrator;
use crate::repository::{storage_error, CredentialRepository};
use crate::stack_service::PollSettings;
use locus_core::effects::{RecoveryEffects, StorageEffects, StorageError};
use locus_core::{
    AuthState, DomainError, LocusConfig, LocusResult, OnboardingStage, ProvisioningState,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Storage key of the single job record.
pub const JOB_KEY: &str = "provisioning-job";

const BOOTSTRAP_MISSING: &str = "Bootstrap credentials missing";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobMode {
    NewDevice { device_name: String },
    Recovery { bucket_name: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobStatus {
    Enqueued,
    Running,
    Succeeded,
    Failed { error: DomainError },
}

/// Persisted provisioning request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningJob {
    pub id: Uuid,
    pub mode: JobMode,
    /// Attempts started so far
    pub attempt: u32,
    pub status: JobStatus,
    /// Stack created by an attempt of this job, recorded as soon as it exists
    #[serde(default)]
    pub stack_id: Option<String>,
}

impl ProvisioningJob {
    /// Whether the job still needs an attempt. A `Running` record found on
    /// disk belongs to a process that died mid-attempt.
    pub fn is_pending(&self) -> bool {
        matches!(self.status, JobStatus::Enqueued | JobStatus::Running)
    }
}

/// Result of one worker invocation, in the shape a scheduler expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkOutcome {
    Success,
    Retry,
    Failure,
}

pub struct ProvisioningWorker<E> {
    effects: Arc<E>,
    storage: Arc<dyn StorageEffects>,
    repository: Arc<CredentialRepository>,
    provisioning: ProvisioningOrchestrator<E>,
    recovery: RecoveryOrchestrator<E>,
    max_attempts: u32,
    retry_backoff_ms: u64,
    in_flight: Mutex<()>,
}

impl<E: RecoveryEffects> ProvisioningWorker<E> {
    pub fn new(
        effects: Arc<E>,
        storage: Arc<dyn StorageEffects>,
        repository: Arc<CredentialRepository>,
        config: &LocusConfig,
    ) -> Self {
        let settings = &config.provisioning;
        Self {
            provisioning: ProvisioningOrchestrator::new(effects.clone(), repository.clone(), settings),
            recovery: RecoveryOrchestrator::new(effects.clone(), repository.clone(), settings),
            effects,
            storage,
            repository,
            max_attempts: config.worker.max_attempts,
            retry_backoff_ms: settings.poll_interval_ms,
            in_flight: Mutex::new(()),
        }
    }

    pub fn with_poll_settings(mut self, settings: PollSettings) -> Self {
        self.provisioning = self.provisioning.with_poll_settings(settings);
        self.recovery = self.recovery.with_poll_settings(settings);
        self
    }

    /// Persist a new job, replacing any finished or abandoned one.
    ///
    /// Fails with `Provisioning::Wait` while an attempt is running in this
    /// process, and with `Auth::InvalidCredentials` when no bootstrap
    /// credentials are stored.
    pub async fn enqueue(&self, mode: JobMode) -> LocusResult<ProvisioningJob> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| DomainError::wait("Provisioning already in progress"))?;

        let target = match &mode {
            JobMode::NewDevice { device_name } => device_name,
            JobMode::Recovery { bucket_name } => bucket_name,
        };
        if target.trim().is_empty() {
            return Err(DomainError::invalid_configuration("Device or bucket name required"));
        }
        self.repository.get_bootstrap_credentials().await?;

        let job = ProvisioningJob {
            id: self.effects.new_uuid().await,
            mode,
            attempt: 0,
            status: JobStatus::Enqueued,
            stack_id: None,
        };
        self.save_job(&job).await?;
        info!(job_id = %job.id, mode = ?job.mode, "provisioning job enqueued");

        if let Err(err) = self
            .repository
            .set_onboarding_stage(OnboardingStage::Provisioning)
            .await
        {
            warn!(error = %err, "could not record onboarding stage");
        }
        self.repository
            .update_provisioning_state(ProvisioningState::working("Starting background setup..."));
        Ok(job)
    }

    /// Run one attempt of the pending job, if any.
    ///
    /// A concurrent call returns `Retry` without touching the job.
    pub async fn run_pending(&self) -> WorkOutcome {
        let Ok(_guard) = self.in_flight.try_lock() else {
            debug!("provisioning attempt already running");
            return WorkOutcome::Retry;
        };

        let mut job = match self.load_job().await {
            Ok(Some(job)) if job.is_pending() => job,
            Ok(_) => {
                debug!("no pending provisioning job");
                return WorkOutcome::Success;
            }
            Err(err) => {
                error!(error = %err, "provisioning job unreadable");
                return WorkOutcome::Failure;
            }
        };

        if let Some(stack_id) = job.stack_id.clone() {
            // A previous process died while this stack was deploying.
            warn!(
                job_id = %job.id,
                %stack_id,
                "stack from an interrupted attempt, not redeploying"
            );
            let error = DomainError::deployment_failed(format!(
                "Setup was interrupted after stack {stack_id} was created"
            ));
            return self.finish_failed(job, error).await;
        }

        job.attempt += 1;
        job.status = JobStatus::Running;
        if let Err(err) = self.save_job(&job).await {
            error!(job_id = %job.id, error = %err, "could not mark job running");
            return WorkOutcome::Failure;
        }
        info!(job_id = %job.id, attempt = job.attempt, "provisioning attempt started");

        let creds = match self.repository.get_bootstrap_credentials().await {
            Ok(creds) => creds,
            Err(err) => {
                warn!(job_id = %job.id, error = %err, "bootstrap credentials unavailable");
                return self
                    .finish_failed(job, DomainError::deployment_failed(BOOTSTRAP_MISSING))
                    .await;
            }
        };

        let (created_tx, mut created_rx) = mpsc::unbounded_channel::<String>();
        let mode = job.mode.clone();
        let attempt = async move {
            let on_created = move |stack_id: &str| {
                let _ = created_tx.send(stack_id.to_string());
            };
            match &mode {
                JobMode::NewDevice { device_name } => {
                    self.provisioning
                        .invoke_tracked(&creds, device_name, &on_created)
                        .await
                }
                JobMode::Recovery { bucket_name } => {
                    self.recovery
                        .invoke_tracked(&creds, bucket_name, &on_created)
                        .await
                }
            }
        };
        // Persist the stack id while the attempt is still polling, so a
        // restart never deploys a second stack for this job.
        let record_stack = async {
            let mut stack_id = None;
            while let Some(id) = created_rx.recv().await {
                let mut running = job.clone();
                running.stack_id = Some(id.clone());
                if let Err(err) = self.save_job(&running).await {
                    warn!(job_id = %job.id, error = %err, "could not record created stack");
                }
                stack_id = Some(id);
            }
            stack_id
        };
        let (result, created) = tokio::join!(attempt, record_stack);
        if created.is_some() {
            job.stack_id = created;
        }

        match result {
            Ok(()) => {
                job.status = JobStatus::Succeeded;
                if let Err(err) = self.save_job(&job).await {
                    warn!(job_id = %job.id, error = %err, "could not record job success");
                }
                if let Err(err) = self
                    .repository
                    .set_onboarding_stage(OnboardingStage::PermissionsPending)
                    .await
                {
                    warn!(error = %err, "could not record onboarding stage");
                }
                info!(job_id = %job.id, "provisioning job succeeded");
                WorkOutcome::Success
            }
            Err(err) if self.should_retry(&job, &err) => {
                warn!(
                    job_id = %job.id,
                    attempt = job.attempt,
                    max_attempts = self.max_attempts,
                    error = %err,
                    "provisioning attempt failed, will retry"
                );
                job.status = JobStatus::Enqueued;
                if let Err(err) = self.save_job(&job).await {
                    error!(job_id = %job.id, error = %err, "could not re-enqueue job");
                    return WorkOutcome::Failure;
                }
                WorkOutcome::Retry
            }
            Err(err) => self.finish_failed(job, err).await,
        }
    }

    /// Drive the pending job until it succeeds or fails for good, sleeping
    /// between retries.
    pub async fn run_until_settled(&self) -> WorkOutcome {
        loop {
            match self.run_pending().await {
                WorkOutcome::Retry => self.effects.sleep_ms(self.retry_backoff_ms).await,
                outcome => return outcome,
            }
        }
    }

    /// Re-derive published state after a restart.
    pub async fn restore(&self) -> LocusResult<ProvisioningState> {
        let auth = self.repository.initialize().await?;

        if let Some(job) = self.load_job().await? {
            match job.status {
                JobStatus::Enqueued | JobStatus::Running => {
                    info!(job_id = %job.id, "resuming provisioning job");
                    self.repository
                        .update_provisioning_state(ProvisioningState::working("Resuming setup..."));
                }
                JobStatus::Failed { error } => {
                    self.repository
                        .update_provisioning_state(ProvisioningState::failure(error));
                }
                JobStatus::Succeeded if auth == AuthState::Authenticated => {
                    self.repository
                        .update_provisioning_state(ProvisioningState::success());
                }
                JobStatus::Succeeded => {
                    warn!(job_id = %job.id, "job succeeded but runtime credentials are missing");
                }
            }
        }

        Ok(self.repository.current_provisioning_state())
    }

    pub async fn current_job(&self) -> LocusResult<Option<ProvisioningJob>> {
        self.load_job().await
    }

    /// Only failures from before a stack existed are retried.
    fn should_retry(&self, job: &ProvisioningJob, err: &DomainError) -> bool {
        job.stack_id.is_none() && err.is_retryable() && job.attempt < self.max_attempts
    }

    /// Record a terminal failure. Orchestrators publish their own failures;
    /// anything they did not publish is published here with the run's history.
    async fn finish_failed(&self, mut job: ProvisioningJob, error: DomainError) -> WorkOutcome {
        error!(job_id = %job.id, %error, "provisioning job failed");
        job.status = JobStatus::Failed {
            error: error.clone(),
        };
        if let Err(err) = self.save_job(&job).await {
            warn!(job_id = %job.id, error = %err, "could not record job failure");
        }

        let current = self.repository.current_provisioning_state();
        let published = matches!(
            &current,
            ProvisioningState::Failure { error: shown, .. } if *shown == error
        );
        if !published {
            // An empty history lets a `Working` state fold its current step in.
            let history = match &current {
                ProvisioningState::Working { .. } => Vec::new(),
                other => other.history().to_vec(),
            };
            self.repository
                .update_provisioning_state(ProvisioningState::Failure { error, history });
        }
        WorkOutcome::Failure
    }

    async fn load_job(&self) -> LocusResult<Option<ProvisioningJob>> {
        read_job(self.storage.as_ref()).await
    }

    async fn save_job(&self, job: &ProvisioningJob) -> LocusResult<()> {
        let bytes = serde_json::to_vec(job).map_err(|e| StorageError::WriteFailed {
            reason: e.to_string(),
        });
        self.storage
            .store(JOB_KEY, bytes.map_err(storage_error)?)
            .await
            .map_err(storage_error)
    }
}

/// Read the persisted job record without a worker, e.g. for status display.
pub async fn read_job(storage: &dyn StorageEffects) -> LocusResult<Option<ProvisioningJob>> {
    let Some(bytes) = storage.retrieve(JOB_KEY).await.map_err(storage_error)? else {
        return Ok(None);
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| storage_error(StorageError::corrupted(format!("provisioning job: {e}"))))
}
