//! Effect traits (ports)
//!
//! Orchestration code is written against these traits only. Production
//! handlers live in `locus-effects`; scripted fakes live in `locus-testkit`.
//!
//! # Effect Classification
//!
//! - **Infrastructure**: `PhysicalTimeEffects`, `RandomEffects`, `StorageEffects`
//! - **Cloud**: `StackLifecycleEffects`, `BucketDirectoryEffects`
//! - **Application**: `ResourceLoaderEffects`, `CredentialStoreEffects`,
//!   `ConfigurationEffects`
//!
//! Cloud ports return `DomainError` directly: adapters translate transport
//! failures at the boundary so orchestrators only ever match on domain kinds.

pub mod bucket;
pub mod configuration;
pub mod credential_store;
pub mod random;
pub mod resource;
pub mod stack;
pub mod storage;
pub mod supertraits;
pub mod time;

pub use bucket::BucketDirectoryEffects;
pub use configuration::ConfigurationEffects;
pub use credential_store::CredentialStoreEffects;
pub use random::RandomEffects;
pub use resource::ResourceLoaderEffects;
pub use stack::StackLifecycleEffects;
pub use storage::{StorageEffects, StorageError};
pub use supertraits::{ProvisioningEffects, RecoveryEffects, StackPollingEffects};
pub use time::PhysicalTimeEffects;
