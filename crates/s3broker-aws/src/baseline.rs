//! Baselines published as S3 objects.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use s3broker_core::document::{
    DocumentFormat, EnvProperties, parse_document, substitute_properties,
};
use s3broker_core::{BaselineSource, ConfigurationError, ProviderError};
use s3broker_model::BaselinePolicy;
use tracing::debug;

use crate::error::classify;

/// An `s3://bucket/key` object location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Location {
    /// Bucket holding the object.
    pub bucket: String,
    /// Object key.
    pub key: String,
}

impl S3Location {
    /// Whether `value` looks like an S3 URI.
    #[must_use]
    pub fn is_s3_uri(value: &str) -> bool {
        value.starts_with("s3://")
    }
}

impl FromStr for S3Location {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigurationError::InvalidValue {
            name: "baselineFile".to_owned(),
            value: s.to_owned(),
        };
        let rest = s.strip_prefix("s3://").ok_or_else(invalid)?;
        let (bucket, key) = rest.split_once('/').ok_or_else(invalid)?;
        if bucket.is_empty() || key.is_empty() {
            return Err(invalid());
        }
        Ok(Self {
            bucket: bucket.to_owned(),
            key: key.to_owned(),
        })
    }
}

impl fmt::Display for S3Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Reads the baseline from an S3 object on every fetch. `${name}`
/// placeholders are resolved from the environment, the same as for a local
/// baseline file.
#[derive(Debug, Clone)]
pub struct S3BaselineSource {
    client: Client,
    location: S3Location,
}

impl S3BaselineSource {
    /// Fetch the baseline at `location` with `client`.
    #[must_use]
    pub fn new(client: Client, location: S3Location) -> Self {
        Self { client, location }
    }
}

#[async_trait]
impl BaselineSource for S3BaselineSource {
    async fn fetch(&self) -> Result<BaselinePolicy, ConfigurationError> {
        let location = self.location.to_string();
        let fetch_error = |source: ProviderError| ConfigurationError::Fetch {
            location: location.clone(),
            source,
        };

        let output = self
            .client
            .get_object()
            .bucket(&self.location.bucket)
            .key(&self.location.key)
            .send()
            .await
            .map_err(|e| fetch_error(classify(&e, &self.location.bucket)))?;
        let body = output.body.collect().await.map_err(|e| {
            fetch_error(ProviderError::Network {
                message: e.to_string(),
            })
        })?;
        let text =
            String::from_utf8(body.into_bytes().to_vec()).map_err(|e| ConfigurationError::Parse {
                location: location.clone(),
                message: e.to_string(),
            })?;
        debug!(location = %location, "baseline object fetched");

        let text = substitute_properties(&text, &location, &EnvProperties)?;
        parse_document(
            &text,
            DocumentFormat::from_path(Path::new(&self.location.key)),
            &location,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_parse_s3_location() {
        let location: S3Location = "s3://org-config/baselines/s3.yml".parse().unwrap();
        assert_eq!(location.bucket, "org-config");
        assert_eq!(location.key, "baselines/s3.yml");
        assert_eq!(location.to_string(), "s3://org-config/baselines/s3.yml");
    }

    #[test]
    fn test_should_reject_malformed_s3_location() {
        for value in ["org-config/s3.yml", "s3://org-config", "s3:///s3.yml", "s3://org-config/"] {
            assert!(
                matches!(
                    value.parse::<S3Location>(),
                    Err(ConfigurationError::InvalidValue { .. })
                ),
                "{value}"
            );
        }
    }

    #[test]
    fn test_should_detect_s3_uris() {
        assert!(S3Location::is_s3_uri("s3://a/b"));
        assert!(!S3Location::is_s3_uri("/etc/baseline.yml"));
    }
}
