//! # Locus Effects - Layer 3: Production Effect Handlers
//!
//! Stateless (or self-contained) implementations of the effect traits defined
//! in `locus-core`. Handlers here touch the operating system: the wall clock,
//! the system RNG, and the filesystem.
//!
//! Cloud ports (`StackLifecycleEffects`, `BucketDirectoryEffects`) have no
//! handler in this crate. Embedding applications supply an AWS-backed adapter;
//! tests supply the scripted fakes from `locus-testkit`.
//!
//! **Layer Constraint**: no mock handlers here. Those belong in `locus-testkit`.

#![forbid(unsafe_code)]

pub mod configuration;
pub mod credential_store;
pub mod encrypted_storage;
pub mod random;
pub mod resource;
pub mod storage;
pub mod system;
pub mod time;

pub use configuration::IdentityStoreHandler;
pub use credential_store::CredentialStoreHandler;
pub use encrypted_storage::{EncryptedStorage, EncryptedStorageConfig};
pub use random::RealRandomHandler;
pub use resource::{BundledTemplateLoader, FileTemplateLoader};
pub use storage::{open_encrypted_store, FilesystemStorageHandler, MemoryStorageHandler};
pub use system::{EffectSystemError, LocusEffectSystem, LocusEffectSystemBuilder};
pub use time::RealTimeHandler;
