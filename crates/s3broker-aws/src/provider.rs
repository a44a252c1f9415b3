//! [`BucketProvider`] over `aws-sdk-s3`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::operation::head_bucket::HeadBucketError;
use aws_sdk_s3::types::{
    BucketLifecycleConfiguration, BucketLocationConstraint, BucketLoggingStatus,
    BucketVersioningStatus, CreateBucketConfiguration, LoggingEnabled, Tag, Tagging,
    VersioningConfiguration,
};
use s3broker_core::{BucketHead, BucketProvider, ProviderResult};
use s3broker_model::{
    EncryptionSettings, LifecycleRule, LoggingTarget, PublicAccessBlock, Region, VersioningStatus,
};
use tracing::debug;

use crate::convert::{
    build_error, encryption_from_sdk, encryption_to_sdk, lifecycle_rule_from_sdk,
    lifecycle_rule_to_sdk, location_region, public_access_block_from_sdk,
    public_access_block_to_sdk,
};
use crate::error::{classify, has_code, region_header, status};

const NO_ENCRYPTION: &str = "ServerSideEncryptionConfigurationNotFoundError";
const NO_LIFECYCLE: &str = "NoSuchLifecycleConfiguration";
const NO_TAGS: &str = "NoSuchTagSet";
const NO_PUBLIC_ACCESS_BLOCK: &str = "NoSuchPublicAccessBlockConfiguration";
const NO_POLICY: &str = "NoSuchBucketPolicy";

/// Bucket provider backed by an S3 client.
#[derive(Debug, Clone)]
pub struct AwsBucketProvider {
    client: Client,
}

impl AwsBucketProvider {
    /// Wrap a configured client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// The underlying client.
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    async fn bucket_location(&self, bucket: &str) -> ProviderResult<String> {
        let output = self
            .client
            .get_bucket_location()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| classify(&e, bucket))?;
        Ok(location_region(output.location_constraint()))
    }
}

#[async_trait]
impl BucketProvider for AwsBucketProvider {
    async fn head_bucket(&self, bucket: &str) -> ProviderResult<Option<BucketHead>> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(output) => {
                let region = match output.bucket_region() {
                    Some(region) => region.to_owned(),
                    None => self.bucket_location(bucket).await?,
                };
                Ok(Some(BucketHead::in_region(region)))
            }
            Err(err) if err.as_service_error().is_some_and(HeadBucketError::is_not_found) => {
                Ok(None)
            }
            Err(err) => match status(&err) {
                // The client is signed for another region; S3 still names
                // the bucket's region.
                Some(301) => match region_header(&err) {
                    Some(region) => Ok(Some(BucketHead::in_region(region))),
                    None => Err(classify(&err, bucket)),
                },
                _ => Err(classify(&err, bucket)),
            },
        }
    }

    async fn create_bucket(&self, bucket: &str, region: Region) -> ProviderResult<()> {
        let mut request = self.client.create_bucket().bucket(bucket);
        if region.needs_location_constraint() {
            let config = CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(region.as_str()))
                .build();
            request = request.create_bucket_configuration(config);
        }
        request.send().await.map_err(|e| classify(&e, bucket))?;
        debug!(bucket, region = %region, "bucket created");
        Ok(())
    }

    async fn get_encryption(&self, bucket: &str) -> ProviderResult<Option<EncryptionSettings>> {
        match self.client.get_bucket_encryption().bucket(bucket).send().await {
            Ok(output) => Ok(output
                .server_side_encryption_configuration()
                .and_then(encryption_from_sdk)),
            Err(err) if has_code(&err, NO_ENCRYPTION) => Ok(None),
            Err(err) => Err(classify(&err, bucket)),
        }
    }

    async fn put_encryption(
        &self,
        bucket: &str,
        encryption: &EncryptionSettings,
    ) -> ProviderResult<()> {
        let config = encryption_to_sdk(encryption).map_err(|e| build_error(&e))?;
        self.client
            .put_bucket_encryption()
            .bucket(bucket)
            .server_side_encryption_configuration(config)
            .send()
            .await
            .map_err(|e| classify(&e, bucket))?;
        Ok(())
    }

    async fn get_versioning(&self, bucket: &str) -> ProviderResult<VersioningStatus> {
        let output = self
            .client
            .get_bucket_versioning()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| classify(&e, bucket))?;
        Ok(match output.status() {
            Some(BucketVersioningStatus::Enabled) => VersioningStatus::Enabled,
            Some(BucketVersioningStatus::Suspended) => VersioningStatus::Suspended,
            _ => VersioningStatus::Disabled,
        })
    }

    async fn put_versioning(&self, bucket: &str, enabled: bool) -> ProviderResult<()> {
        let status = if enabled {
            BucketVersioningStatus::Enabled
        } else {
            BucketVersioningStatus::Suspended
        };
        self.client
            .put_bucket_versioning()
            .bucket(bucket)
            .versioning_configuration(VersioningConfiguration::builder().status(status).build())
            .send()
            .await
            .map_err(|e| classify(&e, bucket))?;
        Ok(())
    }

    async fn get_logging(&self, bucket: &str) -> ProviderResult<Option<LoggingTarget>> {
        let output = self
            .client
            .get_bucket_logging()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| classify(&e, bucket))?;
        Ok(output.logging_enabled().map(|logging| LoggingTarget {
            bucket: logging.target_bucket().to_owned(),
            prefix: logging.target_prefix().to_owned(),
        }))
    }

    async fn put_logging(
        &self,
        bucket: &str,
        target: Option<&LoggingTarget>,
    ) -> ProviderResult<()> {
        let enabled = target
            .map(|t| {
                LoggingEnabled::builder()
                    .target_bucket(&t.bucket)
                    .target_prefix(&t.prefix)
                    .build()
            })
            .transpose()
            .map_err(|e| build_error(&e))?;
        let status = BucketLoggingStatus::builder()
            .set_logging_enabled(enabled)
            .build();
        self.client
            .put_bucket_logging()
            .bucket(bucket)
            .bucket_logging_status(status)
            .send()
            .await
            .map_err(|e| classify(&e, bucket))?;
        Ok(())
    }

    async fn get_lifecycle_rules(&self, bucket: &str) -> ProviderResult<Vec<LifecycleRule>> {
        match self
            .client
            .get_bucket_lifecycle_configuration()
            .bucket(bucket)
            .send()
            .await
        {
            Ok(output) => Ok(output.rules().iter().map(lifecycle_rule_from_sdk).collect()),
            Err(err) if has_code(&err, NO_LIFECYCLE) => Ok(Vec::new()),
            Err(err) => Err(classify(&err, bucket)),
        }
    }

    async fn put_lifecycle_rules(
        &self,
        bucket: &str,
        rules: &[LifecycleRule],
    ) -> ProviderResult<()> {
        if rules.is_empty() {
            self.client
                .delete_bucket_lifecycle()
                .bucket(bucket)
                .send()
                .await
                .map_err(|e| classify(&e, bucket))?;
            return Ok(());
        }

        let rules = rules
            .iter()
            .map(lifecycle_rule_to_sdk)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| build_error(&e))?;
        let config = BucketLifecycleConfiguration::builder()
            .set_rules(Some(rules))
            .build()
            .map_err(|e| build_error(&e))?;
        self.client
            .put_bucket_lifecycle_configuration()
            .bucket(bucket)
            .lifecycle_configuration(config)
            .send()
            .await
            .map_err(|e| classify(&e, bucket))?;
        Ok(())
    }

    async fn get_tags(&self, bucket: &str) -> ProviderResult<BTreeMap<String, String>> {
        match self.client.get_bucket_tagging().bucket(bucket).send().await {
            Ok(output) => Ok(output
                .tag_set()
                .iter()
                .map(|tag| (tag.key().to_owned(), tag.value().to_owned()))
                .collect()),
            Err(err) if has_code(&err, NO_TAGS) => Ok(BTreeMap::new()),
            Err(err) => Err(classify(&err, bucket)),
        }
    }

    async fn put_tags(&self, bucket: &str, tags: &BTreeMap<String, String>) -> ProviderResult<()> {
        if tags.is_empty() {
            self.client
                .delete_bucket_tagging()
                .bucket(bucket)
                .send()
                .await
                .map_err(|e| classify(&e, bucket))?;
            return Ok(());
        }

        let tag_set = tags
            .iter()
            .map(|(key, value)| Tag::builder().key(key).value(value).build())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| build_error(&e))?;
        let tagging = Tagging::builder()
            .set_tag_set(Some(tag_set))
            .build()
            .map_err(|e| build_error(&e))?;
        self.client
            .put_bucket_tagging()
            .bucket(bucket)
            .tagging(tagging)
            .send()
            .await
            .map_err(|e| classify(&e, bucket))?;
        Ok(())
    }

    async fn get_public_access_block(
        &self,
        bucket: &str,
    ) -> ProviderResult<Option<PublicAccessBlock>> {
        match self.client.get_public_access_block().bucket(bucket).send().await {
            Ok(output) => Ok(output
                .public_access_block_configuration()
                .map(public_access_block_from_sdk)),
            Err(err) if has_code(&err, NO_PUBLIC_ACCESS_BLOCK) => Ok(None),
            Err(err) => Err(classify(&err, bucket)),
        }
    }

    async fn put_public_access_block(
        &self,
        bucket: &str,
        block: &PublicAccessBlock,
    ) -> ProviderResult<()> {
        self.client
            .put_public_access_block()
            .bucket(bucket)
            .public_access_block_configuration(public_access_block_to_sdk(block))
            .send()
            .await
            .map_err(|e| classify(&e, bucket))?;
        Ok(())
    }

    async fn get_policy(&self, bucket: &str) -> ProviderResult<Option<String>> {
        match self.client.get_bucket_policy().bucket(bucket).send().await {
            Ok(output) => Ok(output.policy().map(str::to_owned)),
            Err(err) if has_code(&err, NO_POLICY) => Ok(None),
            Err(err) => Err(classify(&err, bucket)),
        }
    }

    async fn put_policy(&self, bucket: &str, policy: &str) -> ProviderResult<()> {
        self.client
            .put_bucket_policy()
            .bucket(bucket)
            .policy(policy)
            .send()
            .await
            .map_err(|e| classify(&e, bucket))?;
        Ok(())
    }
}

impl From<Client> for AwsBucketProvider {
    fn from(client: Client) -> Self {
        Self::new(client)
    }
}

