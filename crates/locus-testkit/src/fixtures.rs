//! Shared fixtures

use locus_core::stack::{
    OUTPUT_ACCESS_KEY_ID, OUTPUT_BUCKET_NAME, OUTPUT_SECRET_ACCESS_KEY, STATUS_CREATE_COMPLETE,
};
use locus_core::{BootstrapCredentials, RuntimeCredentials, StackDetails, StackEvent};
use std::collections::HashMap;

pub const TEST_ACCOUNT_ID: &str = "123456789012";
pub const TEST_REGION: &str = "us-east-1";

pub fn bootstrap_credentials() -> BootstrapCredentials {
    BootstrapCredentials::new("ASIABOOTSTRAP", "bootstrap-secret", "session-token", TEST_REGION)
}

pub fn runtime_credentials() -> RuntimeCredentials {
    RuntimeCredentials {
        access_key_id: "AKIA1".to_string(),
        secret_access_key: "SECRET1".to_string(),
        bucket_name: "locus-bucket-1".to_string(),
        region: TEST_REGION.to_string(),
        account_id: TEST_ACCOUNT_ID.to_string(),
        telemetry_salt: None,
    }
}

/// ARN of `stack_name` in the test account.
pub fn stack_arn(stack_name: &str) -> String {
    format!("arn:aws:cloudformation:{TEST_REGION}:{TEST_ACCOUNT_ID}:stack/{stack_name}/abcd")
}

/// The outputs a healthy device stack reports.
pub fn complete_outputs() -> HashMap<String, String> {
    HashMap::from([
        (OUTPUT_ACCESS_KEY_ID.to_string(), "AKIA1".to_string()),
        (OUTPUT_SECRET_ACCESS_KEY.to_string(), "SECRET1".to_string()),
        (OUTPUT_BUCKET_NAME.to_string(), "locus-bucket-1".to_string()),
    ])
}

pub fn complete_stack_details(stack_name: &str) -> StackDetails {
    StackDetails::new(STATUS_CREATE_COMPLETE)
        .with_stack_id(stack_arn(stack_name))
        .with_outputs(complete_outputs())
}

pub fn stack_event(event_id: &str, timestamp_ms: u64, logical_id: &str, status: &str) -> StackEvent {
    StackEvent {
        event_id: event_id.to_string(),
        timestamp_ms,
        logical_resource_id: logical_id.to_string(),
        resource_status: status.to_string(),
        resource_status_reason: None,
    }
}
