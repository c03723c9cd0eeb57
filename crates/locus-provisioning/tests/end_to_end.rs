//! Full setup flow: paste credentials, enqueue, run, observe.

mod common;

use common::{Harness, DEVICE_NAME, DEVICE_STACK};
use locus_core::identity::is_valid_salt;
use locus_core::{
    AuthState, BootstrapCredentials, OnboardingStage, ProvisioningState, StackDetails,
};
use locus_provisioning::{validate_credentials, JobMode, JobStatus, WorkOutcome};
use locus_testkit::{complete_stack_details, stack_arn, stack_event, TEST_ACCOUNT_ID};

const PASTED: &str = r#"{
    "Credentials": {
        "AccessKeyId": "ASIAPIXEL",
        "SecretAccessKey": "pasted-secret",
        "SessionToken": "pasted-token",
        "Expiration": "2026-10-17T00:00:00Z"
    }
}"#;

#[tokio::test]
async fn pixel_7_new_device_setup() {
    let harness = Harness::new();
    let mut auth = harness.repository.auth_state();
    let progress = harness.repository.provisioning_state();

    let creds = BootstrapCredentials::from_json(PASTED, "us-east-1").unwrap();
    validate_credentials(harness.effects.system.as_ref(), &creds)
        .await
        .unwrap();
    harness
        .repository
        .save_bootstrap_credentials(&creds)
        .await
        .unwrap();
    assert_eq!(*auth.borrow_and_update(), AuthState::SetupPending);

    harness.effects.stacks.push_events(Ok(vec![stack_event(
        "e1",
        1,
        "DeviceBucket",
        "CREATE_IN_PROGRESS",
    )]));
    harness
        .effects
        .stacks
        .push_describe(Ok(StackDetails::new("CREATE_IN_PROGRESS")));
    harness
        .effects
        .stacks
        .push_describe(Ok(complete_stack_details(DEVICE_STACK)));

    let worker = harness.worker();
    worker
        .enqueue(JobMode::NewDevice {
            device_name: DEVICE_NAME.to_string(),
        })
        .await
        .unwrap();
    assert_eq!(worker.run_until_settled().await, WorkOutcome::Success);

    let call = &harness.effects.stacks.create_calls()[0];
    assert_eq!(call.stack_name, DEVICE_STACK);
    assert_eq!(call.region, "us-east-1");

    let runtime = harness.repository.get_runtime_credentials().await.unwrap();
    assert_eq!(runtime.access_key_id, "AKIA1");
    assert_eq!(runtime.secret_access_key, "SECRET1");
    assert_eq!(runtime.bucket_name, "locus-bucket-1");
    assert_eq!(runtime.region, "us-east-1");
    assert_eq!(runtime.account_id, TEST_ACCOUNT_ID);
    assert_eq!(
        stack_arn(DEVICE_STACK),
        "arn:aws:cloudformation:us-east-1:123456789012:stack/locus-user-pixel-7/abcd"
    );
    assert!(runtime.telemetry_salt.as_deref().is_some_and(is_valid_salt));

    assert_eq!(harness.effects.credentials.bootstrap(), None);
    assert_eq!(*auth.borrow_and_update(), AuthState::Authenticated);
    assert_eq!(
        *progress.borrow(),
        ProvisioningState::Success {
            history: vec![
                "Starting background setup...".to_string(),
                format!("Deploying stack {DEVICE_STACK}..."),
                "DeviceBucket: CREATE_IN_PROGRESS".to_string(),
                "Status: CREATE_IN_PROGRESS".to_string(),
                "Finalizing setup...".to_string(),
            ]
        }
    );
    assert_eq!(
        worker.current_job().await.unwrap().unwrap().status,
        JobStatus::Succeeded
    );
    assert_eq!(
        harness.repository.onboarding_stage().await,
        OnboardingStage::PermissionsPending
    );
}
