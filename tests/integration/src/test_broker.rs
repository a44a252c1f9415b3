//! Full broker runs against a live endpoint.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use s3broker_core::{Broker, BrokerError, ReconcileError, StaticBaseline, StepAction};
    use s3broker_model::{BaselinePolicy, BucketProperty, DesiredState, SseAlgorithm};

    use crate::{cleanup_bucket, fast_retry, provider, s3_client, test_bucket_name};

    async fn broker() -> Broker {
        let baseline = BaselinePolicy {
            encryption_algorithm: Some(SseAlgorithm::Aes256),
            ..BaselinePolicy::without_tags().with_tag("managed-by", "platform-tooling")
        };
        Broker::new(
            provider().await,
            Arc::new(StaticBaseline::new(baseline)),
            fast_retry(),
        )
        .with_default_region("us-east-1")
    }

    fn document(bucket: &str) -> DesiredState {
        serde_yaml::from_str(&format!(
            "bucketName: {bucket}\nregion: us-east-1\nencryption:\n  enabled: true\nversioning: true\ntags:\n  team: platform\n"
        ))
        .unwrap()
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_create_and_converge_bucket() {
        let client = s3_client().await;
        let bucket = test_bucket_name("broker");
        let broker = broker().await;

        let run = broker.run_document(document(&bucket)).await.unwrap();
        assert_eq!(run.output.name, bucket);
        assert_eq!(run.output.region, "us-east-1");
        assert_eq!(run.report.steps[0].property, BucketProperty::Bucket);
        assert_eq!(run.report.steps[0].action, StepAction::Created);

        let tagging = client
            .get_bucket_tagging()
            .bucket(&bucket)
            .send()
            .await
            .unwrap();
        let mut tags: Vec<(String, String)> = tagging
            .tag_set()
            .iter()
            .map(|t| (t.key().to_owned(), t.value().to_owned()))
            .collect();
        tags.sort();
        assert_eq!(
            tags,
            vec![
                ("managed-by".to_owned(), "platform-tooling".to_owned()),
                ("team".to_owned(), "platform".to_owned()),
            ]
        );

        cleanup_bucket(&client, &bucket).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_be_idempotent() {
        let client = s3_client().await;
        let bucket = test_bucket_name("idem");
        let broker = broker().await;

        broker.run_document(document(&bucket)).await.unwrap();
        let second = broker.run_document(document(&bucket)).await.unwrap();
        assert!(!second.report.changed(), "{:?}", second.report.steps);

        cleanup_bucket(&client, &bucket).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_strip_public_policy_statements() {
        let client = s3_client().await;
        let bucket = test_bucket_name("policy");
        let broker = broker().await;

        let mut desired = document(&bucket);
        desired.policy_document = Some(serde_json::json!({
            "Version": "2012-10-17",
            "Statement": [{
                "Sid": "PublicRead",
                "Effect": "Allow",
                "Principal": "*",
                "Action": "s3:GetObject",
                "Resource": format!("arn:aws:s3:::{bucket}/*"),
            }]
        }));
        let run = broker.run_document(desired).await.unwrap();
        assert_eq!(run.output.warnings.len(), 1);
        assert!(
            run.report
                .steps
                .iter()
                .all(|s| s.property != BucketProperty::Policy)
        );

        cleanup_bucket(&client, &bucket).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_refuse_region_mismatch() {
        let client = s3_client().await;
        let bucket = test_bucket_name("region");
        let broker = broker().await;

        broker.run_document(document(&bucket)).await.unwrap();
        let mut moved = document(&bucket);
        moved.region = Some("eu-west-1".to_owned());
        let err = broker.run_document(moved).await.unwrap_err();
        assert!(matches!(
            err,
            BrokerError::Reconcile(ReconcileError::RegionMismatch { .. })
        ));

        cleanup_bucket(&client, &bucket).await;
    }
}
