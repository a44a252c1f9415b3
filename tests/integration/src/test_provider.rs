//! `AwsBucketProvider` against a live endpoint.

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use s3broker_core::ProviderError;
    use s3broker_model::{
        EncryptionSettings, LifecycleRule, PublicAccessBlock, Region, SseAlgorithm,
        VersioningStatus,
    };

    use crate::{cleanup_bucket, provider, s3_client, test_bucket_name};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_report_missing_bucket_as_none() {
        let provider = provider().await;
        let head = provider
            .head_bucket(&test_bucket_name("missing"))
            .await
            .unwrap();
        assert!(head.is_none());
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_create_bucket_and_report_owned_conflict() {
        let client = s3_client().await;
        let provider = provider().await;
        let bucket = test_bucket_name("create");

        provider.create_bucket(&bucket, Region::UsEast1).await.unwrap();
        let head = provider.head_bucket(&bucket).await.unwrap().unwrap();
        assert_eq!(head.region.as_deref(), Some("us-east-1"));

        let err = provider
            .create_bucket(&bucket, Region::UsEast1)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProviderError::BucketAlreadyOwnedByYou { .. } | ProviderError::BucketAlreadyExists { .. }
        ));

        cleanup_bucket(&client, &bucket).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_read_unconfigured_properties_as_empty() {
        let client = s3_client().await;
        let provider = provider().await;
        let bucket = test_bucket_name("empty");
        provider.create_bucket(&bucket, Region::UsEast1).await.unwrap();

        assert!(provider.get_tags(&bucket).await.unwrap().is_empty());
        assert!(provider.get_lifecycle_rules(&bucket).await.unwrap().is_empty());
        assert!(provider.get_policy(&bucket).await.unwrap().is_none());
        assert!(provider.get_logging(&bucket).await.unwrap().is_none());
        assert_eq!(
            provider.get_versioning(&bucket).await.unwrap(),
            VersioningStatus::Disabled
        );

        cleanup_bucket(&client, &bucket).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_write_and_read_back_properties() {
        let client = s3_client().await;
        let provider = provider().await;
        let bucket = test_bucket_name("props");
        provider.create_bucket(&bucket, Region::UsEast1).await.unwrap();

        let encryption = EncryptionSettings::new(SseAlgorithm::Aes256);
        provider.put_encryption(&bucket, &encryption).await.unwrap();
        assert_eq!(
            provider.get_encryption(&bucket).await.unwrap(),
            Some(encryption)
        );

        provider.put_versioning(&bucket, true).await.unwrap();
        assert_eq!(
            provider.get_versioning(&bucket).await.unwrap(),
            VersioningStatus::Enabled
        );
        provider.put_versioning(&bucket, false).await.unwrap();
        assert_eq!(
            provider.get_versioning(&bucket).await.unwrap(),
            VersioningStatus::Suspended
        );

        let tags = BTreeMap::from([
            ("team".to_owned(), "platform".to_owned()),
            ("managed-by".to_owned(), "s3broker".to_owned()),
        ]);
        provider.put_tags(&bucket, &tags).await.unwrap();
        assert_eq!(provider.get_tags(&bucket).await.unwrap(), tags);
        provider.put_tags(&bucket, &BTreeMap::new()).await.unwrap();
        assert!(provider.get_tags(&bucket).await.unwrap().is_empty());

        let rules = vec![LifecycleRule {
            id: "expire-tmp".to_owned(),
            prefix: Some("tmp/".to_owned()),
            expiration_days: Some(7),
            transition: None,
            enabled: true,
        }];
        provider.put_lifecycle_rules(&bucket, &rules).await.unwrap();
        assert_eq!(provider.get_lifecycle_rules(&bucket).await.unwrap(), rules);

        let block = PublicAccessBlock::all_blocked();
        provider.put_public_access_block(&bucket, &block).await.unwrap();
        assert_eq!(
            provider.get_public_access_block(&bucket).await.unwrap(),
            Some(block)
        );

        cleanup_bucket(&client, &bucket).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_fail_reads_on_missing_bucket() {
        let provider = provider().await;
        let err = provider
            .get_versioning(&test_bucket_name("gone"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NoSuchBucket { .. }));
    }
}
