//! Durable worker: enqueue, retry classification and restart reconciliation.

mod common;

use assert_matches::assert_matches;
use common::{Harness, DEVICE_NAME, DEVICE_STACK};
use locus_core::effects::StorageEffects;
use locus_core::stack::TAG_STACK_NAME;
use locus_core::{
    AuthError, AuthState, DomainError, NetworkError, OnboardingStage, ProvisioningError,
    ProvisioningState, RecoveryError,
};
use locus_effects::LocusEffectSystem;
use locus_provisioning::{
    CredentialRepository, JobMode, JobStatus, ProvisioningJob, ProvisioningWorker, WorkOutcome,
    JOB_KEY,
};
use locus_testkit::{complete_stack_details, runtime_credentials, stack_arn};
use std::sync::Arc;

const BUCKET: &str = "locus-old-bucket";

fn recovery() -> JobMode {
    JobMode::Recovery {
        bucket_name: BUCKET.to_string(),
    }
}

fn new_device() -> JobMode {
    JobMode::NewDevice {
        device_name: DEVICE_NAME.to_string(),
    }
}

/// Worker and repository as a fresh process would build them over the same
/// persisted stores.
fn restarted(harness: &Harness) -> (ProvisioningWorker<LocusEffectSystem>, Arc<CredentialRepository>) {
    let repository = Arc::new(CredentialRepository::new(Arc::new(
        harness.effects.credentials.clone(),
    )));
    let worker = ProvisioningWorker::new(
        harness.effects.system.clone(),
        harness.effects.system.storage(),
        repository.clone(),
        &harness.config,
    );
    (worker, repository)
}

#[tokio::test]
async fn enqueue_requires_bootstrap_credentials() {
    let harness = Harness::new();
    let worker = harness.worker();

    assert_matches!(
        worker.enqueue(new_device()).await,
        Err(DomainError::Auth(AuthError::InvalidCredentials))
    );
    assert_eq!(worker.current_job().await.unwrap(), None);
    assert_eq!(
        harness.repository.current_provisioning_state(),
        ProvisioningState::Idle
    );
}

#[tokio::test]
async fn enqueue_persists_job_and_publishes_start() {
    let harness = Harness::with_bootstrap().await;
    let worker = harness.worker();

    let job = worker.enqueue(new_device()).await.unwrap();

    assert_eq!(job.status, JobStatus::Enqueued);
    assert_eq!(job.attempt, 0);
    assert_eq!(worker.current_job().await.unwrap(), Some(job));
    assert_eq!(
        harness.repository.current_provisioning_state(),
        ProvisioningState::working("Starting background setup...")
    );
    assert_eq!(
        harness.repository.onboarding_stage().await,
        OnboardingStage::Provisioning
    );
    // The record is encrypted at rest
    assert!(harness.effects.storage.len().await > 0);
}

#[tokio::test]
async fn enqueue_rejects_blank_target() {
    let harness = Harness::with_bootstrap().await;
    let result = harness
        .worker()
        .enqueue(JobMode::Recovery {
            bucket_name: " ".to_string(),
        })
        .await;
    assert_matches!(
        result,
        Err(DomainError::Provisioning(ProvisioningError::InvalidConfiguration { .. }))
    );
}

#[tokio::test]
async fn no_pending_job_is_success() {
    let harness = Harness::new();
    assert_eq!(harness.worker().run_pending().await, WorkOutcome::Success);
    assert_eq!(harness.effects.stacks.create_call_count(), 0);
}

#[tokio::test]
async fn network_failure_is_retried() {
    let harness = Harness::with_bootstrap().await;
    let worker = harness.worker();
    worker.enqueue(new_device()).await.unwrap();
    harness
        .effects
        .stacks
        .set_create_result(Err(NetworkError::Offline.into()));

    assert_eq!(worker.run_pending().await, WorkOutcome::Retry);
    let job = worker.current_job().await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Enqueued);
    assert_eq!(job.attempt, 1);

    harness
        .effects
        .stacks
        .set_create_result(Ok(stack_arn(DEVICE_STACK)));
    harness
        .effects
        .stacks
        .push_describe(Ok(complete_stack_details(DEVICE_STACK)));

    assert_eq!(worker.run_pending().await, WorkOutcome::Success);
    let job = worker.current_job().await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Succeeded);
    assert_eq!(job.attempt, 2);
    assert_eq!(harness.repository.current_auth_state(), AuthState::Authenticated);
    assert_eq!(
        harness.repository.onboarding_stage().await,
        OnboardingStage::PermissionsPending
    );
}

#[tokio::test]
async fn retries_stop_at_max_attempts() {
    let harness = Harness::with_bootstrap().await;
    let worker = harness.worker();
    worker.enqueue(new_device()).await.unwrap();
    harness
        .effects
        .stacks
        .set_create_result(Err(NetworkError::Timeout.into()));

    assert_eq!(worker.run_until_settled().await, WorkOutcome::Failure);

    assert_eq!(harness.effects.stacks.create_call_count(), 3);
    assert_eq!(harness.effects.clock.sleeps(), vec![5_000, 5_000]);
    let timeout: DomainError = NetworkError::Timeout.into();
    assert_eq!(
        worker.current_job().await.unwrap().unwrap().status,
        JobStatus::Failed {
            error: timeout.clone()
        }
    );
    assert_matches!(
        harness.repository.current_provisioning_state(),
        ProvisioningState::Failure { error, .. } if error == timeout
    );
}

#[tokio::test]
async fn poll_timeout_after_stack_creation_is_final() {
    let harness = Harness::with_bootstrap().await;
    let worker = harness.worker();
    worker.enqueue(new_device()).await.unwrap();

    // The default describe response never completes.
    assert_eq!(worker.run_until_settled().await, WorkOutcome::Failure);

    assert_eq!(harness.effects.stacks.create_call_count(), 1);
    let job = worker.current_job().await.unwrap().unwrap();
    assert_eq!(job.attempt, 1);
    assert_eq!(job.stack_id, Some(stack_arn(DEVICE_STACK)));
    assert_eq!(
        job.status,
        JobStatus::Failed {
            error: NetworkError::Timeout.into()
        }
    );
    assert_matches!(
        harness.repository.current_provisioning_state(),
        ProvisioningState::Failure {
            error: DomainError::Network(NetworkError::Timeout),
            ..
        }
    );
}

#[tokio::test]
async fn recovery_timeout_deploys_a_single_stack() {
    let harness = Harness::with_bootstrap().await;
    harness
        .effects
        .buckets
        .add_bucket(BUCKET, &[(TAG_STACK_NAME, "locus-user-old-phone")]);
    let worker = harness.worker();
    worker.enqueue(recovery()).await.unwrap();

    assert_eq!(worker.run_until_settled().await, WorkOutcome::Failure);

    assert_eq!(harness.effects.stacks.create_call_count(), 1);
    assert_eq!(harness.effects.stacks.describe_call_count(), 120);
    assert_eq!(harness.effects.identity.write_count(), 0);
}

#[tokio::test]
async fn interrupted_job_with_stack_is_not_redeployed() {
    let harness = Harness::with_bootstrap().await;
    let job = ProvisioningJob {
        id: uuid::Uuid::nil(),
        mode: new_device(),
        attempt: 1,
        status: JobStatus::Running,
        stack_id: Some(stack_arn(DEVICE_STACK)),
    };
    harness
        .effects
        .system
        .storage()
        .store(JOB_KEY, serde_json::to_vec(&job).unwrap())
        .await
        .unwrap();

    let worker = harness.worker();
    assert_eq!(worker.run_pending().await, WorkOutcome::Failure);

    assert_eq!(harness.effects.stacks.create_call_count(), 0);
    assert_matches!(
        worker.current_job().await.unwrap().unwrap().status,
        JobStatus::Failed {
            error: DomainError::Provisioning(ProvisioningError::DeploymentFailed { .. })
        }
    );
}

#[tokio::test]
async fn fatal_errors_fail_immediately() {
    let harness = Harness::with_bootstrap().await;
    let worker = harness.worker();
    worker.enqueue(new_device()).await.unwrap();
    harness
        .effects
        .stacks
        .set_create_result(Err(AuthError::AccessDenied.into()));

    assert_eq!(worker.run_until_settled().await, WorkOutcome::Failure);
    assert_eq!(harness.effects.stacks.create_call_count(), 1);
    assert_matches!(
        harness.repository.current_provisioning_state(),
        ProvisioningState::Failure {
            error: DomainError::Auth(AuthError::AccessDenied),
            ..
        }
    );
    assert_eq!(
        worker.current_job().await.unwrap().unwrap().status,
        JobStatus::Failed {
            error: AuthError::AccessDenied.into()
        }
    );
}

#[tokio::test]
async fn recovery_failure_keeps_its_kind() {
    let harness = Harness::with_bootstrap().await;
    harness
        .effects
        .buckets
        .add_bucket(BUCKET, &[("LocusRole", "DeviceBucket")]);
    let worker = harness.worker();
    worker.enqueue(recovery()).await.unwrap();

    assert_eq!(worker.run_pending().await, WorkOutcome::Failure);

    let missing_tag: DomainError = RecoveryError::MissingStackTag.into();
    assert_eq!(
        harness.repository.current_provisioning_state(),
        ProvisioningState::Failure {
            error: missing_tag.clone(),
            history: vec!["Validating bucket ownership...".to_string()],
        }
    );

    let (worker, _repository) = restarted(&harness);
    assert_eq!(
        worker.restore().await.unwrap(),
        ProvisioningState::failure(missing_tag)
    );
}

#[tokio::test]
async fn missing_bootstrap_at_run_time_is_fatal() {
    let harness = Harness::with_bootstrap().await;
    let worker = harness.worker();
    worker.enqueue(new_device()).await.unwrap();
    harness.repository.clear_bootstrap_credentials().await.unwrap();

    assert_eq!(worker.run_pending().await, WorkOutcome::Failure);
    assert_eq!(harness.effects.stacks.create_call_count(), 0);
    assert_matches!(
        harness.repository.current_provisioning_state(),
        ProvisioningState::Failure { error, .. }
            if error == DomainError::deployment_failed("Bootstrap credentials missing")
    );
}

#[tokio::test]
async fn only_one_attempt_runs_at_a_time() {
    let harness = Harness::with_bootstrap().await;
    let worker = Arc::new(harness.worker());
    worker.enqueue(new_device()).await.unwrap();

    // The default describe response never completes, so the attempt parks
    // in the polling loop and yields on every virtual sleep.
    let running = tokio::spawn({
        let worker = worker.clone();
        async move { worker.run_pending().await }
    });
    tokio::task::yield_now().await;

    assert_matches!(
        worker.enqueue(new_device()).await,
        Err(DomainError::Provisioning(ProvisioningError::Wait { .. }))
    );
    assert_eq!(worker.run_pending().await, WorkOutcome::Retry);

    // The stack exists by then, so the eventual poll timeout is final.
    assert_eq!(running.await.unwrap(), WorkOutcome::Failure);
    assert_eq!(harness.effects.stacks.create_call_count(), 1);
}

#[tokio::test]
async fn restore_resumes_pending_job() {
    let harness = Harness::with_bootstrap().await;
    harness.worker().enqueue(new_device()).await.unwrap();

    let (worker, repository) = restarted(&harness);
    let state = worker.restore().await.unwrap();

    assert_eq!(state, ProvisioningState::working("Resuming setup..."));
    assert_eq!(repository.current_auth_state(), AuthState::SetupPending);
}

#[tokio::test]
async fn restore_reports_failed_job() {
    let harness = Harness::with_bootstrap().await;
    let worker = harness.worker();
    worker.enqueue(new_device()).await.unwrap();
    harness
        .effects
        .stacks
        .set_create_result(Err(ProvisioningError::StackExists {
            stack_name: DEVICE_STACK.to_string(),
        }
        .into()));
    assert_eq!(worker.run_pending().await, WorkOutcome::Failure);

    let (worker, _repository) = restarted(&harness);
    let state = worker.restore().await.unwrap();

    assert_eq!(
        state,
        ProvisioningState::failure(
            ProvisioningError::StackExists {
                stack_name: DEVICE_STACK.to_string(),
            }
            .into()
        )
    );
}

#[tokio::test]
async fn restore_reports_success_once_authenticated() {
    let harness = Harness::with_bootstrap().await;
    let worker = harness.worker();
    worker.enqueue(new_device()).await.unwrap();
    harness
        .effects
        .stacks
        .push_describe(Ok(complete_stack_details(DEVICE_STACK)));
    assert_eq!(worker.run_pending().await, WorkOutcome::Success);

    let (worker, repository) = restarted(&harness);
    assert_eq!(worker.restore().await.unwrap(), ProvisioningState::success());
    assert_eq!(repository.current_auth_state(), AuthState::Authenticated);
}

#[tokio::test]
async fn restore_without_job_only_derives_auth() {
    let harness = Harness::new();
    harness.effects.credentials.seed_runtime(runtime_credentials());

    let (worker, repository) = restarted(&harness);

    assert_eq!(worker.restore().await.unwrap(), ProvisioningState::Idle);
    assert_eq!(repository.current_auth_state(), AuthState::Authenticated);
}
