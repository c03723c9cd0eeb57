//! Interpreting stack outputs
//!
//! Both orchestrators need the same three facts from a finished stack: the
//! runtime key pair and the account id encoded in the stack ARN. New-device
//! provisioning additionally needs the bucket the stack created.

use locus_core::stack::{OUTPUT_ACCESS_KEY_ID, OUTPUT_BUCKET_NAME, OUTPUT_SECRET_ACCESS_KEY};
use locus_core::{DomainError, LocusResult, RuntimeCredentials, StackProvisioningResult};

const INVALID_OUTPUTS: &str = "Invalid stack outputs";

/// Validated runtime identity minted by a stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeOutputs {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: Option<String>,
    pub account_id: String,
}

impl RuntimeOutputs {
    /// Extract the key pair and account id; the bucket output is optional.
    pub fn parse(result: &StackProvisioningResult) -> LocusResult<Self> {
        let invalid = || DomainError::deployment_failed(INVALID_OUTPUTS);

        let access_key_id = result.output(OUTPUT_ACCESS_KEY_ID).ok_or_else(invalid)?;
        let secret_access_key = result.output(OUTPUT_SECRET_ACCESS_KEY).ok_or_else(invalid)?;
        let account_id = result.account_id().ok_or_else(invalid)?;

        Ok(Self {
            access_key_id: access_key_id.to_string(),
            secret_access_key: secret_access_key.to_string(),
            bucket_name: result.output(OUTPUT_BUCKET_NAME).map(str::to_string),
            account_id,
        })
    }

    /// Like [`parse`](Self::parse), but the stack must also report its
    /// bucket, which is returned alongside.
    pub fn parse_with_bucket(result: &StackProvisioningResult) -> LocusResult<(Self, String)> {
        let mut outputs = Self::parse(result)?;
        let bucket_name = outputs
            .bucket_name
            .take()
            .ok_or_else(|| DomainError::deployment_failed(INVALID_OUTPUTS))?;
        Ok((outputs, bucket_name))
    }

    pub fn into_runtime_credentials(
        self,
        bucket_name: String,
        region: String,
        telemetry_salt: String,
    ) -> RuntimeCredentials {
        RuntimeCredentials {
            access_key_id: self.access_key_id,
            secret_access_key: self.secret_access_key,
            bucket_name,
            region,
            account_id: self.account_id,
            telemetry_salt: Some(telemetry_salt),
        }
    }
}
