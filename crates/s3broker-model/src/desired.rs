//! The bucket configuration document.
//!
//! [`DesiredState`] mirrors the deployment's `s3.yml` (or `.json`) file field
//! for field. Parsing is deliberately lenient: structural checks such as
//! bucket-name rules, region support and lifecycle consistency are performed
//! by the policy merger so they surface as validation errors rather than
//! document parse errors.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// Server-side encryption algorithm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SseAlgorithm {
    /// Provider-managed keys (`AES256`).
    #[default]
    #[serde(rename = "AES256")]
    Aes256,
    /// KMS-managed keys (`aws:kms`).
    #[serde(rename = "aws:kms")]
    AwsKms,
    /// Dual-layer KMS encryption (`aws:kms:dsse`).
    #[serde(rename = "aws:kms:dsse")]
    AwsKmsDsse,
}

impl SseAlgorithm {
    /// The provider identifier for this algorithm.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SseAlgorithm::Aes256 => "AES256",
            SseAlgorithm::AwsKms => "aws:kms",
            SseAlgorithm::AwsKmsDsse => "aws:kms:dsse",
        }
    }

    /// Whether the algorithm is backed by a KMS key.
    #[must_use]
    pub fn uses_kms(self) -> bool {
        matches!(self, SseAlgorithm::AwsKms | SseAlgorithm::AwsKmsDsse)
    }
}

impl fmt::Display for SseAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SseAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AES256" => Ok(SseAlgorithm::Aes256),
            "aws:kms" => Ok(SseAlgorithm::AwsKms),
            "aws:kms:dsse" => Ok(SseAlgorithm::AwsKmsDsse),
            other => Err(format!("unknown server-side encryption algorithm: {other}")),
        }
    }
}

/// The `encryption` block of the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionConfig {
    /// Whether default encryption should be on. The baseline forces this.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Requested algorithm.
    #[serde(default)]
    pub algorithm: SseAlgorithm,
    /// KMS key id or ARN, only meaningful for KMS algorithms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kms_key_id: Option<String>,
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            algorithm: SseAlgorithm::default(),
            kms_key_id: None,
        }
    }
}

/// The `logging` block of the document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// Whether server access logging should be on.
    #[serde(default)]
    pub enabled: bool,
    /// Bucket that receives the access logs. Required when enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_bucket: Option<String>,
    /// Key prefix for delivered log objects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_prefix: Option<String>,
}

/// A storage-class transition inside a lifecycle rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    /// Days after object creation when the transition happens.
    pub days: i32,
    /// Target storage class (e.g. `GLACIER`, `STANDARD_IA`).
    pub storage_class: String,
}

/// A single lifecycle rule. Order in the document is preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleRule {
    /// Unique rule identifier.
    pub id: String,
    /// Key prefix the rule applies to. An empty string targets the whole
    /// bucket; a missing prefix is a validation error.
    #[serde(default)]
    pub prefix: Option<String>,
    /// Expire objects this many days after creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_days: Option<i32>,
    /// Move objects to another storage class.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition: Option<Transition>,
    /// Whether the rule is active.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// A bucket tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    /// Tag key.
    pub key: String,
    /// Tag value.
    pub value: String,
}

impl Tag {
    /// Create a tag from a key and value.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// The deployment's bucket configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesiredState {
    /// Bucket name; must be non-empty and valid for the provider.
    #[serde(default)]
    pub bucket_name: String,
    /// Target region. When omitted, the invocation's region is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Default encryption.
    #[serde(default)]
    pub encryption: EncryptionConfig,
    /// Whether object versioning should be enabled.
    #[serde(default)]
    pub versioning: bool,
    /// Server access logging. Omit to leave the bucket's logging untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
    /// Lifecycle rules. Omit to leave the bucket's lifecycle untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifecycle_rules: Option<Vec<LifecycleRule>>,
    /// Bucket tags, written either as a mapping or as a list of
    /// `{key, value}` pairs. Duplicates in the list form are kept here and
    /// rejected during validation.
    #[serde(default, deserialize_with = "deserialize_tags")]
    pub tags: Vec<Tag>,
    /// Raw access-policy document, either inline or as a JSON string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_document: Option<serde_json::Value>,
    /// Whether all public access should be blocked.
    #[serde(default = "default_true")]
    pub public_access_block: bool,
}

impl DesiredState {
    /// A minimal document for `bucket_name`, everything else defaulted.
    pub fn new(bucket_name: impl Into<String>) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            region: None,
            encryption: EncryptionConfig::default(),
            versioning: false,
            logging: None,
            lifecycle_rules: None,
            tags: Vec::new(),
            policy_document: None,
            public_access_block: true,
        }
    }

    /// Fill in the region when the document did not specify one.
    #[must_use]
    pub fn with_default_region(mut self, region: &str) -> Self {
        if self.region.as_deref().is_none_or(str::is_empty) {
            self.region = Some(region.to_owned());
        }
        self
    }
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TagsDocument {
    Map(BTreeMap<String, String>),
    List(Vec<Tag>),
}

/// Accept `tags: {team: platform}` as well as
/// `tags: [{key: team, value: platform}]`.
fn deserialize_tags<'de, D>(deserializer: D) -> Result<Vec<Tag>, D::Error>
where
    D: Deserializer<'de>,
{
    let doc = Option::<TagsDocument>::deserialize(deserializer)?;
    Ok(match doc {
        None => Vec::new(),
        Some(TagsDocument::Map(pairs)) => pairs.into_iter().map(|(k, v)| Tag::new(k, v)).collect(),
        Some(TagsDocument::List(tags)) => tags,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_parse_full_document() {
        let yaml = r#"
bucketName: app-logs
region: us-east-1
encryption:
  enabled: true
  algorithm: aws:kms
  kmsKeyId: alias/app
versioning: true
logging:
  enabled: true
  targetBucket: central-logs
  targetPrefix: app-logs/
lifecycleRules:
  - id: expire-tmp
    prefix: tmp/
    expirationDays: 7
  - id: archive
    prefix: ""
    transition:
      days: 30
      storageClass: GLACIER
tags:
  team: platform
policyDocument:
  Version: "2012-10-17"
  Statement: []
publicAccessBlock: false
"#;
        let doc: DesiredState = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(doc.bucket_name, "app-logs");
        assert_eq!(doc.region.as_deref(), Some("us-east-1"));
        assert_eq!(doc.encryption.algorithm, SseAlgorithm::AwsKms);
        assert_eq!(doc.encryption.kms_key_id.as_deref(), Some("alias/app"));
        assert!(doc.versioning);
        let logging = doc.logging.unwrap();
        assert_eq!(logging.target_bucket.as_deref(), Some("central-logs"));
        let rules = doc.lifecycle_rules.unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].expiration_days, Some(7));
        assert_eq!(rules[1].prefix.as_deref(), Some(""));
        assert_eq!(
            rules[1].transition.as_ref().map(|t| t.storage_class.as_str()),
            Some("GLACIER")
        );
        assert!(rules[1].enabled);
        assert_eq!(doc.tags, vec![Tag::new("team", "platform")]);
        assert!(doc.policy_document.is_some());
        assert!(!doc.public_access_block);
    }

    #[test]
    fn test_should_apply_defaults_for_minimal_document() {
        let doc: DesiredState = serde_yaml::from_str("bucketName: tiny").unwrap();
        assert_eq!(doc, DesiredState::new("tiny"));
        assert!(doc.encryption.enabled);
        assert_eq!(doc.encryption.algorithm, SseAlgorithm::Aes256);
        assert!(doc.public_access_block);
        assert!(doc.lifecycle_rules.is_none());
        assert!(doc.logging.is_none());
    }

    #[test]
    fn test_should_accept_tag_list_form() {
        let json = r#"{"bucketName":"b","tags":[{"key":"a","value":"1"},{"key":"a","value":"2"}]}"#;
        let doc: DesiredState = serde_json::from_str(json).unwrap();
        assert_eq!(doc.tags, vec![Tag::new("a", "1"), Tag::new("a", "2")]);
    }

    #[test]
    fn test_should_keep_missing_lifecycle_prefix_as_none() {
        let yaml = "bucketName: b\nlifecycleRules:\n  - id: r1\n    expirationDays: 3\n";
        let doc: DesiredState = serde_yaml::from_str(yaml).unwrap();
        let rules = doc.lifecycle_rules.unwrap();
        assert_eq!(rules[0].prefix, None);
    }

    #[test]
    fn test_should_fill_default_region_only_when_missing() {
        let doc = DesiredState::new("b").with_default_region("eu-west-1");
        assert_eq!(doc.region.as_deref(), Some("eu-west-1"));

        let mut explicit = DesiredState::new("b");
        explicit.region = Some("us-west-2".to_owned());
        let doc = explicit.with_default_region("eu-west-1");
        assert_eq!(doc.region.as_deref(), Some("us-west-2"));
    }

    #[test]
    fn test_should_round_trip_sse_algorithm_names() {
        for alg in [
            SseAlgorithm::Aes256,
            SseAlgorithm::AwsKms,
            SseAlgorithm::AwsKmsDsse,
        ] {
            assert_eq!(alg.as_str().parse::<SseAlgorithm>(), Ok(alg));
        }
        assert!("rot13".parse::<SseAlgorithm>().is_err());
        assert!(SseAlgorithm::AwsKms.uses_kms());
        assert!(!SseAlgorithm::Aes256.uses_kms());
    }
}
