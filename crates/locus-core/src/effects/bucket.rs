//! S3 bucket directory port

use crate::credentials::BootstrapCredentials;
use crate::errors::LocusResult;
use async_trait::async_trait;
use std::collections::HashMap;

#[async_trait]
pub trait BucketDirectoryEffects: Send + Sync {
    /// Names of every bucket visible to the credentials.
    async fn list_buckets(&self, creds: &BootstrapCredentials) -> LocusResult<Vec<String>>;

    /// Tag set of one bucket.
    async fn get_bucket_tags(
        &self,
        creds: &BootstrapCredentials,
        bucket_name: &str,
    ) -> LocusResult<HashMap<String, String>>;
}
