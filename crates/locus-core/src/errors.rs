//! Closed error taxonomy for Locus provisioning
//!
//! Every failure that reaches an orchestrator boundary, and therefore every
//! failure an observer can see in `ProvisioningState::Failure`, is one of the
//! kinds below. Port implementations translate transport failures into this
//! taxonomy before returning.

use serde::{Deserialize, Serialize};

/// Standard result type for Locus operations.
pub type LocusResult<T> = std::result::Result<T, DomainError>;

/// Top-level domain error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum DomainError {
    /// Connectivity or transport failure
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// Credential or authorization failure
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Stack deployment failure
    #[error(transparent)]
    Provisioning(#[from] ProvisioningError),

    /// Existing-bucket recovery failure
    #[error(transparent)]
    Recovery(#[from] RecoveryError),

    /// Bucket-level failure
    #[error(transparent)]
    S3(#[from] S3Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum NetworkError {
    #[error("Network is offline")]
    Offline,

    #[error("Request timed out")]
    Timeout,

    #[error("Server error {code}: {message}")]
    ServerError { code: u16, message: String },

    #[error("{cause}")]
    Generic { cause: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials provided")]
    InvalidCredentials,

    #[error("Credentials have expired")]
    Expired,

    #[error("Access denied")]
    AccessDenied,

    #[error("{cause}")]
    Generic { cause: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum ProvisioningError {
    #[error("Stack '{stack_name}' already exists")]
    StackExists { stack_name: String },

    #[error("{message}")]
    Permissions { message: String },

    #[error("{message}")]
    Quota { message: String },

    #[error("{message}")]
    DeploymentFailed { message: String },

    #[error("{message}")]
    Wait { message: String },

    #[error("{message}")]
    InvalidConfiguration { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum RecoveryError {
    #[error("Bucket is not managed by Locus: missing CloudFormation stack-name tag")]
    MissingStackTag,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum S3Error {
    #[error("Bucket '{bucket_name}' not found")]
    BucketNotFound { bucket_name: String },

    #[error("{cause}")]
    Generic { cause: String },
}

impl DomainError {
    /// Create a deployment failure
    pub fn deployment_failed(message: impl Into<String>) -> Self {
        ProvisioningError::DeploymentFailed {
            message: message.into(),
        }
        .into()
    }

    /// Create an invalid-configuration failure
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        ProvisioningError::InvalidConfiguration {
            message: message.into(),
        }
        .into()
    }

    /// Create a provisioning wait error (another attempt is in flight)
    pub fn wait(message: impl Into<String>) -> Self {
        ProvisioningError::Wait {
            message: message.into(),
        }
        .into()
    }

    /// Create a generic network error from any displayable cause
    pub fn network(cause: impl std::fmt::Display) -> Self {
        NetworkError::Generic {
            cause: cause.to_string(),
        }
        .into()
    }

    /// Create a generic auth error from any displayable cause
    pub fn auth(cause: impl std::fmt::Display) -> Self {
        AuthError::Generic {
            cause: cause.to_string(),
        }
        .into()
    }

    /// Create a generic S3 error from any displayable cause
    pub fn s3(cause: impl std::fmt::Display) -> Self {
        S3Error::Generic {
            cause: cause.to_string(),
        }
        .into()
    }

    /// Errors that make further stack polling pointless.
    ///
    /// Credential problems and account limits do not heal while a stack is
    /// deploying; everything else is treated as transient during polling.
    pub fn is_permanent_polling_error(&self) -> bool {
        matches!(
            self,
            DomainError::Auth(_)
                | DomainError::Provisioning(ProvisioningError::Quota { .. })
                | DomainError::Provisioning(ProvisioningError::Permissions { .. })
        )
    }

    /// Errors for which a durable worker should schedule another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DomainError::Network(_) | DomainError::Provisioning(ProvisioningError::Wait { .. })
        )
    }
}
