//! # Locus Core - Layer 1: Foundation Types
//!
//! Shared vocabulary for the Locus provisioning subsystem. Everything in this
//! crate is pure: data types, the closed error taxonomy, configuration, and the
//! effect traits (ports) that higher layers are parameterized over.
//!
//! ## What Belongs Here
//!
//! - `DomainError` and its sub-kinds (the only errors observers ever see)
//! - Bootstrap and runtime credential records
//! - `AuthState`, `ProvisioningState` and the bounded progress history
//! - CloudFormation stack model and output parsing helpers
//! - Effect traits: stack lifecycle, bucket directory, template loading,
//!   time, randomness, storage, credential store, identity configuration
//!
//! ## What Does NOT Belong Here
//!
//! - Effect handler implementations (belong in `locus-effects`)
//! - Orchestration logic (belongs in `locus-provisioning`)
//! - Test doubles (belong in `locus-testkit`)

#![forbid(unsafe_code)]

/// Runtime configuration loaded from TOML
pub mod config;

/// Bootstrap and runtime credential records
pub mod credentials;

/// Effect trait definitions (ports)
pub mod effects;

/// Closed domain error taxonomy
pub mod errors;

/// Device identity and telemetry salt generation
pub mod identity;

/// CloudFormation stack model, constants and output parsing
pub mod stack;

/// Authentication and provisioning state machines
pub mod state;

pub use config::{ConfigError, LocusConfig, ProvisioningSettings, StorageSettings, WorkerSettings};
pub use credentials::{BootstrapCredentials, RuntimeCredentials};
pub use errors::{
    AuthError, DomainError, LocusResult, NetworkError, ProvisioningError, RecoveryError, S3Error,
};
pub use stack::{StackDetails, StackEvent, StackProvisioningResult};
pub use state::{
    AuthState, BucketValidationError, BucketValidationStatus, OnboardingStage, ProgressLog,
    ProvisioningState, MAX_HISTORY_SIZE,
};
