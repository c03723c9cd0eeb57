//! # Locus Testkit - Layer 8: Test Infrastructure
//!
//! Scripted fakes for every port in `locus_core::effects`, a virtual clock,
//! failure-injecting stores, and fixtures shared by the integration tests of
//! the other crates.
//!
//! ```rust,ignore
//! let stacks = Arc::new(ScriptedStackLifecycle::new());
//! stacks.push_describe(Ok(StackDetails::new("CREATE_IN_PROGRESS")));
//! stacks.push_describe(Ok(complete_stack_details()));
//!
//! let effects = TestEffects::builder().stacks(stacks.clone()).build();
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod cloud;
pub mod effects;
pub mod fixtures;
pub mod random;
pub mod stores;
pub mod templates;
pub mod time;

pub use cloud::{FakeBucketDirectory, ScriptedStackLifecycle};
pub use effects::{TestEffects, TestEffectsBuilder};
pub use fixtures::*;
pub use random::SeededRandom;
pub use stores::{MemoryCredentialStore, RecordingIdentityStore};
pub use templates::StaticTemplateLoader;
pub use time::SimulatedClock;

/// Install a test-friendly tracing subscriber.
///
/// Honours `RUST_LOG`. Safe to call from every test; only the first call
/// installs anything.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
