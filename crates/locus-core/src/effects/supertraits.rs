//! Supertraits for common effect combinations
//!
//! Each is blanket-implemented, so any handler set that provides the
//! component traits satisfies them automatically.

use super::{
    BucketDirectoryEffects, ConfigurationEffects, PhysicalTimeEffects, RandomEffects,
    ResourceLoaderEffects, StackLifecycleEffects,
};

/// Effects needed to create a stack and poll it to completion.
pub trait StackPollingEffects: StackLifecycleEffects + PhysicalTimeEffects {}

impl<T> StackPollingEffects for T where T: StackLifecycleEffects + PhysicalTimeEffects {}

/// Effects needed to provision a new device.
pub trait ProvisioningEffects:
    StackPollingEffects + ResourceLoaderEffects + RandomEffects + ConfigurationEffects
{
}

impl<T> ProvisioningEffects for T where
    T: StackPollingEffects + ResourceLoaderEffects + RandomEffects + ConfigurationEffects
{
}

/// Effects needed to adopt an existing bucket.
pub trait RecoveryEffects: ProvisioningEffects + BucketDirectoryEffects {}

impl<T> RecoveryEffects for T where T: ProvisioningEffects + BucketDirectoryEffects {}
