//! Integration tests for s3broker.
//!
//! These tests require an S3-compatible endpoint (LocalStack or MinIO) at
//! `localhost:4566`, or wherever `S3_ENDPOINT_URL` points. They are marked
//! `#[ignore]` so they don't run during normal `cargo test`.
//!
//! Run them with:
//! ```text
//! cargo test -p s3broker-integration -- --ignored
//! ```

use std::sync::{Arc, Once};
use std::time::Duration;

use s3broker_aws::{AwsBucketProvider, ClientOptions, SessionCredentials, build_client};
use s3broker_core::{BucketProvider, RetryPolicy};

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Endpoint URL for the server.
fn endpoint_url() -> String {
    std::env::var("S3_ENDPOINT_URL").unwrap_or_else(|_| "http://localhost:4566".to_owned())
}

/// Create a configured S3 client pointing at the local endpoint.
pub async fn s3_client() -> aws_sdk_s3::Client {
    init_tracing();

    let options = ClientOptions::builder()
        .region("us-east-1")
        .endpoint_url(endpoint_url())
        .force_path_style(true)
        .credentials(SessionCredentials::new("test", "test"))
        .build();
    build_client(&options).await
}

/// A provider over [`s3_client`].
pub async fn provider() -> Arc<dyn BucketProvider> {
    Arc::new(AwsBucketProvider::new(s3_client().await))
}

/// A short retry policy so failing tests fail fast.
#[must_use]
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::default()
        .with_max_attempts(3)
        .with_backoff(Duration::from_millis(50), Duration::from_millis(200))
        .with_call_timeout(Duration::from_secs(10))
}

/// Generate a unique bucket name for a test.
#[must_use]
pub fn test_bucket_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().to_string()[..8].to_owned();
    format!("test-{prefix}-{id}")
}

/// Delete all objects in a bucket, then delete the bucket.
pub async fn cleanup_bucket(client: &aws_sdk_s3::Client, bucket: &str) {
    let mut continuation_token = None;
    loop {
        let mut req = client.list_objects_v2().bucket(bucket);
        if let Some(token) = continuation_token.take() {
            req = req.continuation_token(token);
        }
        let Ok(resp) = req.send().await else {
            return; // Bucket may not exist.
        };

        for obj in resp.contents() {
            if let Some(key) = obj.key() {
                let _ = client.delete_object().bucket(bucket).key(key).send().await;
            }
        }

        if resp.is_truncated() == Some(true) {
            continuation_token = resp.next_continuation_token().map(ToOwned::to_owned);
        } else {
            break;
        }
    }

    let _ = client.delete_bucket().bucket(bucket).send().await;
}

mod test_broker;
mod test_provider;
