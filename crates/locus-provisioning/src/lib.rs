//! # Locus Provisioning - Layer 5: Orchestration
//!
//! Turns a set of temporary bootstrap credentials into a provisioned device:
//!
//! 1. [`StackProvisioningService`] creates one CloudFormation stack and polls
//!    it to a terminal status, tolerating transient failures.
//! 2. [`ProvisioningOrchestrator`] provisions a brand-new device and bucket.
//! 3. [`RecoveryOrchestrator`] adopts an existing Locus bucket under a fresh
//!    device identity.
//! 4. [`CredentialRepository`] owns the persisted credentials and publishes
//!    `AuthState` and `ProvisioningState` to any number of observers.
//! 5. [`ProvisioningWorker`] runs one attempt at a time from a persisted job
//!    record, so setup resumes after a restart.
//!
//! Every component is parameterized over the effect traits in
//! `locus_core::effects`; nothing here performs I/O directly.

#![forbid(unsafe_code)]

pub mod outputs;
pub mod provisioning;
pub mod recovery;
pub mod repository;
pub mod scan;
pub mod stack_service;
pub mod worker;

pub use provisioning::ProvisioningOrchestrator;
pub use recovery::RecoveryOrchestrator;
pub use repository::CredentialRepository;
pub use scan::{validate_credentials, BucketScanner};
pub use stack_service::{
    PollSettings, StackCreatedCallback, StackProvisioningService, StatusCallback,
};
pub use worker::{
    read_job, JobMode, JobStatus, ProvisioningJob, ProvisioningWorker, WorkOutcome, JOB_KEY,
};
