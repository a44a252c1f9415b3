//! The provider seam.
//!
//! [`BucketProvider`] is the narrow set of bucket-level calls the probe and
//! the reconciler need. The AWS implementation lives in `s3broker-aws`; an
//! in-memory implementation for tests lives in [`crate::memory`].
//!
//! Conventions every implementation follows:
//!
//! - `head_bucket` returns `Ok(None)` for a bucket that does not exist.
//! - A sub-property that was never configured reads as its empty value
//!   (`None`, empty vector, empty map), never as an error.
//! - Writes replace the whole sub-property. An empty tag set or an empty
//!   rule list removes the configuration.

use std::collections::BTreeMap;

use async_trait::async_trait;
use s3broker_model::{
    EncryptionSettings, LifecycleRule, LoggingTarget, PublicAccessBlock, Region, VersioningStatus,
};

use crate::error::ProviderError;

/// Result alias for provider calls.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// What an existence check learns about a bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketHead {
    /// Region the provider reports, if it reports one.
    pub region: Option<String>,
}

impl BucketHead {
    /// A head result carrying `region`.
    pub fn in_region(region: impl Into<String>) -> Self {
        Self {
            region: Some(region.into()),
        }
    }
}

/// Bucket-level operations against an object-storage provider.
#[async_trait]
pub trait BucketProvider: Send + Sync + std::fmt::Debug {
    /// Check whether the bucket exists; `None` when it does not.
    async fn head_bucket(&self, bucket: &str) -> ProviderResult<Option<BucketHead>>;

    /// Create the bucket in `region`.
    async fn create_bucket(&self, bucket: &str, region: Region) -> ProviderResult<()>;

    /// Read default encryption.
    async fn get_encryption(&self, bucket: &str) -> ProviderResult<Option<EncryptionSettings>>;

    /// Write default encryption.
    async fn put_encryption(
        &self,
        bucket: &str,
        encryption: &EncryptionSettings,
    ) -> ProviderResult<()>;

    /// Read the versioning status.
    async fn get_versioning(&self, bucket: &str) -> ProviderResult<VersioningStatus>;

    /// Enable or suspend versioning.
    async fn put_versioning(&self, bucket: &str, enabled: bool) -> ProviderResult<()>;

    /// Read the access-logging target.
    async fn get_logging(&self, bucket: &str) -> ProviderResult<Option<LoggingTarget>>;

    /// Write the access-logging target; `None` disables logging.
    async fn put_logging(&self, bucket: &str, target: Option<&LoggingTarget>)
    -> ProviderResult<()>;

    /// Read lifecycle rules.
    async fn get_lifecycle_rules(&self, bucket: &str) -> ProviderResult<Vec<LifecycleRule>>;

    /// Replace lifecycle rules; an empty slice removes them.
    async fn put_lifecycle_rules(&self, bucket: &str, rules: &[LifecycleRule])
    -> ProviderResult<()>;

    /// Read tags.
    async fn get_tags(&self, bucket: &str) -> ProviderResult<BTreeMap<String, String>>;

    /// Replace tags; an empty map removes them.
    async fn put_tags(&self, bucket: &str, tags: &BTreeMap<String, String>) -> ProviderResult<()>;

    /// Read the public access block.
    async fn get_public_access_block(
        &self,
        bucket: &str,
    ) -> ProviderResult<Option<PublicAccessBlock>>;

    /// Write the public access block.
    async fn put_public_access_block(
        &self,
        bucket: &str,
        block: &PublicAccessBlock,
    ) -> ProviderResult<()>;

    /// Read the raw policy document.
    async fn get_policy(&self, bucket: &str) -> ProviderResult<Option<String>>;

    /// Replace the policy document.
    async fn put_policy(&self, bucket: &str, policy: &str) -> ProviderResult<()>;
}
