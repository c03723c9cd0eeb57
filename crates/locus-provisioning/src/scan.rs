//! Bucket discovery and credential checks
//!
//! Used before recovery to offer the user the buckets an earlier install
//! left behind, and before provisioning to reject credentials early.

use futures::future::join_all;
use locus_core::effects::BucketDirectoryEffects;
use locus_core::stack::{TAG_DEVICE_BUCKET, TAG_LOCUS_ROLE};
use locus_core::{
    AuthError, BootstrapCredentials, BucketValidationError, BucketValidationStatus, LocusResult,
};
use std::sync::Arc;
use tracing::{debug, info};

pub struct BucketScanner<E> {
    effects: Arc<E>,
    bucket_prefix: String,
}

impl<E: BucketDirectoryEffects> BucketScanner<E> {
    pub fn new(effects: Arc<E>, bucket_prefix: impl Into<String>) -> Self {
        Self {
            effects,
            bucket_prefix: bucket_prefix.into(),
        }
    }

    /// Classify every bucket whose name carries the Locus prefix.
    ///
    /// A listing failure fails the scan; a tag lookup failure only marks
    /// that bucket as `AccessDenied`.
    pub async fn scan(
        &self,
        creds: &BootstrapCredentials,
    ) -> LocusResult<Vec<(String, BucketValidationStatus)>> {
        let buckets = self.effects.list_buckets(creds).await?;
        let candidates: Vec<String> = buckets
            .into_iter()
            .filter(|name| name.starts_with(&self.bucket_prefix))
            .collect();

        // Tag lookups are independent; results keep listing order.
        let results: Vec<_> = join_all(candidates.into_iter().map(|bucket| async move {
            let status = self.classify(creds, &bucket).await;
            (bucket, status)
        }))
        .await;

        info!(candidates = results.len(), "bucket scan complete");
        Ok(results)
    }

    async fn classify(&self, creds: &BootstrapCredentials, bucket: &str) -> BucketValidationStatus {
        match self.effects.get_bucket_tags(creds, bucket).await {
            Ok(tags) if tags.get(TAG_LOCUS_ROLE).map(String::as_str) == Some(TAG_DEVICE_BUCKET) => {
                BucketValidationStatus::Available
            }
            Ok(_) => BucketValidationStatus::Invalid(BucketValidationError::MissingLocusTag),
            Err(err) => {
                debug!(bucket, error = %err, "bucket tags unreadable");
                BucketValidationStatus::Invalid(BucketValidationError::AccessDenied)
            }
        }
    }
}

/// Check that `creds` are well formed and accepted by the provider.
pub async fn validate_credentials<E>(effects: &E, creds: &BootstrapCredentials) -> LocusResult<()>
where
    E: BucketDirectoryEffects + ?Sized,
{
    creds.validate()?;
    effects.list_buckets(creds).await.map_err(|err| {
        debug!(error = %err, "credential check failed");
        AuthError::InvalidCredentials
    })?;
    Ok(())
}
