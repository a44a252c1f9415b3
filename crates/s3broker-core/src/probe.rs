//! Read-only snapshot of a bucket's live configuration.

use std::future::Future;
use std::sync::Arc;

use s3broker_model::{BucketProperty, LiveBucket, LiveState, Region};
use tracing::debug;

use crate::error::{ProbeError, ProviderError};
use crate::provider::BucketProvider;
use crate::retry::RetryPolicy;

/// Fetches [`LiveState`] through a [`BucketProvider`].
#[derive(Debug, Clone)]
pub struct StateProbe {
    provider: Arc<dyn BucketProvider>,
    retry: RetryPolicy,
}

impl StateProbe {
    /// Create a probe over `provider`.
    pub fn new(provider: Arc<dyn BucketProvider>, retry: RetryPolicy) -> Self {
        Self { provider, retry }
    }

    /// Probe the bucket `name`.
    ///
    /// The existence check runs first; properties are only read when the
    /// bucket exists in `region`. `region` is recorded as the bucket's region
    /// when the provider does not report one. A bucket found in another
    /// region is returned with only its name and region, since property reads
    /// against it would be redirected.
    ///
    /// # Errors
    ///
    /// Returns a [`ProbeError`] naming the property whose read failed after
    /// retries. A missing bucket is [`LiveState::Absent`], not an error.
    pub async fn probe(&self, name: &str, region: Region) -> Result<LiveState, ProbeError> {
        let provider = &self.provider;

        let Some(head) = self
            .read(name, BucketProperty::Bucket, || provider.head_bucket(name))
            .await?
        else {
            debug!(bucket = %name, "bucket absent");
            return Ok(LiveState::Absent);
        };
        let live_region = head
            .region
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| region.as_str().to_owned());

        if live_region != region.as_str() {
            debug!(
                bucket = %name,
                region = %live_region,
                expected = %region,
                "bucket lives in another region"
            );
            return Ok(LiveState::Present(LiveBucket {
                region: live_region,
                ..LiveBucket::fresh(name, region)
            }));
        }

        let public_access_block = self
            .read(name, BucketProperty::PublicAccessBlock, || {
                provider.get_public_access_block(name)
            })
            .await?;
        let encryption = self
            .read(name, BucketProperty::Encryption, || provider.get_encryption(name))
            .await?;
        let versioning = self
            .read(name, BucketProperty::Versioning, || provider.get_versioning(name))
            .await?;
        let logging = self
            .read(name, BucketProperty::Logging, || provider.get_logging(name))
            .await?;
        let tags = self
            .read(name, BucketProperty::Tags, || provider.get_tags(name))
            .await?;
        let lifecycle_rules = self
            .read(name, BucketProperty::LifecycleRules, || {
                provider.get_lifecycle_rules(name)
            })
            .await?;
        let policy = self
            .read(name, BucketProperty::Policy, || provider.get_policy(name))
            .await?;

        let live = LiveBucket {
            name: name.to_owned(),
            region: live_region,
            encryption,
            versioning,
            logging,
            lifecycle_rules,
            tags,
            public_access_block,
            policy,
        };
        debug!(
            bucket = %name,
            region = %live.region,
            versioning = ?live.versioning,
            tags = live.tags.len(),
            lifecycle_rules = live.lifecycle_rules.len(),
            has_policy = live.policy.is_some(),
            "bucket probed"
        );
        Ok(LiveState::Present(live))
    }

    async fn read<T, F, Fut>(
        &self,
        bucket: &str,
        property: BucketProperty,
        call: F,
    ) -> Result<T, ProbeError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        self.retry
            .run(property.as_str(), call)
            .await
            .map_err(|source| ProbeError {
                bucket: bucket.to_owned(),
                property,
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::time::Duration;

    use s3broker_model::{PublicAccessBlock, VersioningStatus};

    use super::*;
    use crate::memory::{CallKind, InMemoryProvider};

    fn probe(provider: &Arc<InMemoryProvider>) -> StateProbe {
        let retry = RetryPolicy::default()
            .with_backoff(Duration::from_millis(1), Duration::from_millis(2));
        StateProbe::new(Arc::clone(provider) as Arc<dyn BucketProvider>, retry)
    }

    #[tokio::test]
    async fn test_should_probe_missing_bucket_as_absent() {
        let provider = Arc::new(InMemoryProvider::new());
        let live = probe(&provider).probe("nope", Region::UsEast1).await.unwrap();
        assert_eq!(live, LiveState::Absent);
        assert_eq!(provider.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_should_read_every_property_of_existing_bucket() {
        let provider = Arc::new(InMemoryProvider::new());
        let mut bucket = LiveBucket::fresh("app-logs", Region::EuWest1);
        bucket.versioning = VersioningStatus::Enabled;
        bucket.tags = BTreeMap::from([("team".to_owned(), "platform".to_owned())]);
        bucket.public_access_block = Some(PublicAccessBlock::all_blocked());
        provider.insert_bucket(bucket.clone());

        let live = probe(&provider)
            .probe("app-logs", Region::EuWest1)
            .await
            .unwrap();
        assert_eq!(live, LiveState::Present(bucket));
        assert_eq!(provider.mutation_count(), 0);
        assert_eq!(provider.calls().len(), 8);
    }

    #[tokio::test]
    async fn test_should_report_failed_property_read() {
        let provider = Arc::new(InMemoryProvider::new());
        provider.insert_bucket(LiveBucket::fresh("app-logs", Region::UsEast1));
        provider.fail_next(
            CallKind::GetTags,
            ProviderError::AccessDenied {
                message: "denied".to_owned(),
            },
        );

        let err = probe(&provider)
            .probe("app-logs", Region::UsEast1)
            .await
            .unwrap_err();
        assert_eq!(err.property, BucketProperty::Tags);
        assert!(matches!(err.source, ProviderError::AccessDenied { .. }));
    }

    #[tokio::test]
    async fn test_should_retry_transient_head_failure() {
        let provider = Arc::new(InMemoryProvider::new());
        provider.fail_times(
            CallKind::HeadBucket,
            ProviderError::Unavailable {
                message: "503".to_owned(),
            },
            2,
        );
        let live = probe(&provider).probe("nope", Region::UsEast1).await.unwrap();
        assert_eq!(live, LiveState::Absent);
        assert_eq!(provider.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_should_skip_property_reads_for_bucket_in_other_region() {
        let provider = Arc::new(InMemoryProvider::new());
        let mut bucket = LiveBucket::fresh("app-logs", Region::EuWest1);
        bucket.versioning = VersioningStatus::Enabled;
        provider.insert_bucket(bucket);
        let redirect = ProviderError::rejected("PermanentRedirect", "use the eu-west-1 endpoint");
        for kind in [
            CallKind::GetPublicAccessBlock,
            CallKind::GetEncryption,
            CallKind::GetVersioning,
            CallKind::GetLogging,
            CallKind::GetTags,
            CallKind::GetLifecycleRules,
            CallKind::GetPolicy,
        ] {
            provider.fail_next(kind, redirect.clone());
        }

        let live = probe(&provider)
            .probe("app-logs", Region::UsEast1)
            .await
            .unwrap();
        assert_eq!(
            live,
            LiveState::Present(LiveBucket::fresh("app-logs", Region::EuWest1))
        );
        assert_eq!(provider.call_kinds(), vec![CallKind::HeadBucket]);
    }

    #[tokio::test]
    async fn test_should_not_treat_head_access_denied_as_absent() {
        let provider = Arc::new(InMemoryProvider::new());
        provider.fail_next(
            CallKind::HeadBucket,
            ProviderError::AccessDenied {
                message: "denied".to_owned(),
            },
        );

        let err = probe(&provider)
            .probe("app-logs", Region::UsEast1)
            .await
            .unwrap_err();
        assert_eq!(err.property, BucketProperty::Bucket);
        assert!(matches!(err.source, ProviderError::AccessDenied { .. }));
        assert_eq!(provider.calls().len(), 1);
        assert!(!provider.call_kinds().contains(&CallKind::CreateBucket));
    }
}
