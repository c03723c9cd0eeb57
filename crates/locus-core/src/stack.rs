//! CloudFormation stack model
//!
//! Names of tags, outputs and statuses the orchestrators depend on, plus the
//! small parsing helpers for stack ARNs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Tag CloudFormation attaches to every resource it creates.
pub const TAG_STACK_NAME: &str = "aws:cloudformation:stack-name";
/// Tag key marking a bucket as a Locus device bucket.
pub const TAG_LOCUS_ROLE: &str = "LocusRole";
/// Expected value of [`TAG_LOCUS_ROLE`].
pub const TAG_DEVICE_BUCKET: &str = "DeviceBucket";

pub const OUTPUT_ACCESS_KEY_ID: &str = "RuntimeAccessKeyId";
pub const OUTPUT_SECRET_ACCESS_KEY: &str = "RuntimeSecretAccessKey";
pub const OUTPUT_BUCKET_NAME: &str = "BucketName";

pub const PARAM_STACK_NAME: &str = "StackName";
pub const PARAM_BUCKET_NAME: &str = "BucketName";

pub const STATUS_CREATE_COMPLETE: &str = "CREATE_COMPLETE";

/// Statuses after which a stack will never reach `CREATE_COMPLETE`.
pub const PERMANENT_FAILURE_STATUSES: [&str; 3] =
    ["CREATE_FAILED", "ROLLBACK_IN_PROGRESS", "ROLLBACK_COMPLETE"];

/// Snapshot returned by a describe-stack call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackDetails {
    pub stack_id: Option<String>,
    pub status: String,
    pub outputs: Option<HashMap<String, String>>,
}

impl StackDetails {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            stack_id: None,
            status: status.into(),
            outputs: None,
        }
    }

    pub fn with_stack_id(mut self, stack_id: impl Into<String>) -> Self {
        self.stack_id = Some(stack_id.into());
        self
    }

    pub fn with_outputs(mut self, outputs: HashMap<String, String>) -> Self {
        self.outputs = Some(outputs);
        self
    }
}

/// One resource event from a stack's event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackEvent {
    pub event_id: String,
    pub timestamp_ms: u64,
    pub logical_resource_id: String,
    pub resource_status: String,
    pub resource_status_reason: Option<String>,
}

impl StackEvent {
    /// Whether this event is worth showing as a progress line.
    pub fn is_reportable(&self) -> bool {
        let status = self.resource_status.as_str();
        status.ends_with("_IN_PROGRESS") || status.ends_with("_COMPLETE") || status.ends_with("_FAILED")
    }

    pub fn progress_line(&self) -> String {
        format!("{}: {}", self.logical_resource_id, self.resource_status)
    }
}

/// Outcome of a stack that reached `CREATE_COMPLETE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackProvisioningResult {
    pub stack_id: String,
    pub outputs: HashMap<String, String>,
}

impl StackProvisioningResult {
    /// Non-blank output value for `key`.
    pub fn output(&self, key: &str) -> Option<&str> {
        self.outputs
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    pub fn account_id(&self) -> Option<String> {
        extract_account_id(&self.stack_id)
    }
}

/// Account id from a stack ARN (`arn:aws:cloudformation:<region>:<account>:stack/...`).
pub fn extract_account_id(arn: &str) -> Option<String> {
    arn.split(':')
        .nth(4)
        .map(str::trim)
        .filter(|account| !account.is_empty())
        .map(str::to_string)
}

pub fn is_permanent_failure_status(status: &str) -> bool {
    PERMANENT_FAILURE_STATUSES.contains(&status)
}

/// Stack name for a device: `<prefix><suffix>`.
pub fn stack_name_for(prefix: &str, suffix: &str) -> String {
    format!("{prefix}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_extract_account_id() {
        assert_eq!(
            extract_account_id("arn:aws:cloudformation:us-east-1:123456789012:stack/locus-user-pixel-7/abcd"),
            Some("123456789012".to_string())
        );
        assert_eq!(extract_account_id("not-an-arn"), None);
        assert_eq!(extract_account_id("arn:aws:cloudformation:us-east-1::stack/x"), None);
    }

    #[test]
    fn test_permanent_statuses() {
        assert!(is_permanent_failure_status("ROLLBACK_COMPLETE"));
        assert!(!is_permanent_failure_status("CREATE_IN_PROGRESS"));
        assert!(!is_permanent_failure_status(STATUS_CREATE_COMPLETE));
    }

    #[test]
    fn test_blank_outputs_are_absent() {
        let result = StackProvisioningResult {
            stack_id: "arn:aws:cloudformation:us-east-1:1:stack/s/x".to_string(),
            outputs: HashMap::from([
                (OUTPUT_ACCESS_KEY_ID.to_string(), "AKIA1".to_string()),
                (OUTPUT_SECRET_ACCESS_KEY.to_string(), "  ".to_string()),
            ]),
        };
        assert_eq!(result.output(OUTPUT_ACCESS_KEY_ID), Some("AKIA1"));
        assert_eq!(result.output(OUTPUT_SECRET_ACCESS_KEY), None);
        assert_eq!(result.output(OUTPUT_BUCKET_NAME), None);
    }

    #[test]
    fn test_event_filtering() {
        let event = |status: &str| StackEvent {
            event_id: "e".to_string(),
            timestamp_ms: 0,
            logical_resource_id: "LocusBucket".to_string(),
            resource_status: status.to_string(),
            resource_status_reason: None,
        };
        assert!(event("CREATE_IN_PROGRESS").is_reportable());
        assert!(event("CREATE_FAILED").is_reportable());
        assert!(!event("UPDATE_ROLLBACK_COMPLETE_CLEANUP").is_reportable());
        assert_eq!(event("CREATE_COMPLETE").progress_line(), "LocusBucket: CREATE_COMPLETE");
    }

    proptest! {
        #[test]
        fn prop_account_id_is_fifth_field(account in "[0-9]{12}", region in "[a-z]{2}-[a-z]+-[0-9]") {
            let arn = format!("arn:aws:cloudformation:{region}:{account}:stack/locus-user-x/id");
            prop_assert_eq!(extract_account_id(&arn), Some(account));
        }
    }
}
