//! Bootstrap and runtime credential records
//!
//! Bootstrap credentials are the temporary STS credentials a user pastes in to
//! perform setup. Runtime credentials are minted by the provisioned stack and
//! are scoped to a single bucket. Both are zeroized on drop and redact their
//! secrets in `Debug` output.

use crate::errors::{AuthError, LocusResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Region used when pasted credentials do not name one.
pub const DEFAULT_BOOTSTRAP_REGION: &str = "us-east-1";

/// Temporary credentials used only during provisioning.
///
/// The session token is mandatory: it is what guarantees the credentials are
/// short-lived.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct BootstrapCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub region: String,
}

impl BootstrapCredentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: session_token.into(),
            region: region.into(),
        }
    }

    /// Reject records with any blank field.
    pub fn validate(&self) -> LocusResult<()> {
        let blank = [
            &self.access_key_id,
            &self.secret_access_key,
            &self.session_token,
            &self.region,
        ]
        .iter()
        .any(|field| field.trim().is_empty());

        if blank {
            return Err(AuthError::InvalidCredentials.into());
        }
        Ok(())
    }

    /// Parse credentials pasted from the AWS CLI.
    ///
    /// Accepts both the `aws sts get-session-token` shape (keys nested under
    /// `Credentials`) and a flat object. Unknown keys are ignored.
    pub fn from_json(text: &str, default_region: &str) -> LocusResult<Self> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|_| AuthError::InvalidCredentials)?;

        let object = value.get("Credentials").unwrap_or(&value);
        let pasted: PastedCredentials =
            serde_json::from_value(object.clone()).map_err(|_| AuthError::InvalidCredentials)?;

        let region = pasted
            .region
            .or_else(|| {
                value
                    .get("Region")
                    .and_then(|r| r.as_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| default_region.to_string());

        let creds = Self::new(
            pasted.access_key_id,
            pasted.secret_access_key,
            pasted.session_token,
            region,
        );
        creds.validate()?;
        Ok(creds)
    }
}

impl fmt::Debug for BootstrapCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .field("region", &self.region)
            .finish()
    }
}

#[derive(Deserialize)]
struct PastedCredentials {
    #[serde(rename = "AccessKeyId")]
    access_key_id: String,
    #[serde(rename = "SecretAccessKey")]
    secret_access_key: String,
    #[serde(rename = "SessionToken")]
    session_token: String,
    #[serde(rename = "Region", default)]
    region: Option<String>,
}

/// Long-lived credentials for day-to-day operation, scoped to one bucket.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct RuntimeCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
    pub region: String,
    pub account_id: String,
    #[serde(default)]
    pub telemetry_salt: Option<String>,
}

impl fmt::Debug for RuntimeCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("bucket_name", &self.bucket_name)
            .field("region", &self.region)
            .field("account_id", &self.account_id)
            .field(
                "telemetry_salt",
                &self.telemetry_salt.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DomainError;
    use assert_matches::assert_matches;

    #[test]
    fn test_validate_rejects_blank_fields() {
        let creds = BootstrapCredentials::new("AKIA", "secret", "   ", "us-east-1");
        assert_matches!(
            creds.validate(),
            Err(DomainError::Auth(AuthError::InvalidCredentials))
        );

        let creds = BootstrapCredentials::new("AKIA", "secret", "token", "us-east-1");
        assert!(creds.validate().is_ok());
    }

    #[test]
    fn test_from_json_accepts_sts_shape() {
        let text = r#"{
            "Credentials": {
                "AccessKeyId": "ASIAEXAMPLE",
                "SecretAccessKey": "wJalr",
                "SessionToken": "FwoGZX",
                "Expiration": "2026-01-01T00:00:00Z"
            }
        }"#;

        let creds = BootstrapCredentials::from_json(text, DEFAULT_BOOTSTRAP_REGION).unwrap();
        assert_eq!(creds.access_key_id, "ASIAEXAMPLE");
        assert_eq!(creds.session_token, "FwoGZX");
        assert_eq!(creds.region, "us-east-1");
    }

    #[test]
    fn test_from_json_accepts_flat_shape_with_region() {
        let text = r#"{"AccessKeyId":"A","SecretAccessKey":"S","SessionToken":"T","Region":"eu-west-1"}"#;
        let creds = BootstrapCredentials::from_json(text, DEFAULT_BOOTSTRAP_REGION).unwrap();
        assert_eq!(creds.region, "eu-west-1");
    }

    #[test]
    fn test_from_json_missing_session_token() {
        let text = r#"{"AccessKeyId":"A","SecretAccessKey":"S"}"#;
        assert_matches!(
            BootstrapCredentials::from_json(text, DEFAULT_BOOTSTRAP_REGION),
            Err(DomainError::Auth(AuthError::InvalidCredentials))
        );
        assert_matches!(
            BootstrapCredentials::from_json("not json", DEFAULT_BOOTSTRAP_REGION),
            Err(DomainError::Auth(AuthError::InvalidCredentials))
        );
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = BootstrapCredentials::new("AKIA", "very-secret", "tok", "us-east-1");
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("AKIA"));
        assert!(!rendered.contains("very-secret"));
        assert!(!rendered.contains("tok\""));

        let runtime = RuntimeCredentials {
            access_key_id: "AKIA1".to_string(),
            secret_access_key: "SECRET1".to_string(),
            bucket_name: "locus-bucket-1".to_string(),
            region: "us-east-1".to_string(),
            account_id: "123456789012".to_string(),
            telemetry_salt: Some("ab".repeat(32)),
        };
        let rendered = format!("{runtime:?}");
        assert!(!rendered.contains("SECRET1"));
        assert!(rendered.contains("locus-bucket-1"));
    }
}
