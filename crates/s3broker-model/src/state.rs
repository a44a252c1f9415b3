//! Effective (target) state, live (observed) state and the reconciled
//! bucket identity.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::desired::{LifecycleRule, SseAlgorithm};
use crate::region::Region;

// ---------------------------------------------------------------------------
// Shared property values
// ---------------------------------------------------------------------------

/// Bucket versioning status as reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersioningStatus {
    /// Versioning has never been enabled on this bucket.
    #[default]
    Disabled,
    /// Versioning is currently enabled.
    Enabled,
    /// Versioning was previously enabled but is now suspended.
    Suspended,
}

/// Default encryption applied to a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionSettings {
    /// The encryption algorithm.
    pub algorithm: SseAlgorithm,
    /// KMS key id (only for KMS algorithms).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kms_key_id: Option<String>,
}

impl EncryptionSettings {
    /// Settings for `algorithm` without an explicit key.
    #[must_use]
    pub fn new(algorithm: SseAlgorithm) -> Self {
        Self {
            algorithm,
            kms_key_id: None,
        }
    }
}

/// Where server access logs are delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingTarget {
    /// Bucket receiving the logs.
    pub bucket: String,
    /// Key prefix of delivered log objects (empty for none).
    #[serde(default)]
    pub prefix: String,
}

/// Desired logging configuration once the document declared one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LoggingSetting {
    /// Access logging must be off.
    Disabled,
    /// Access logging must deliver to the given target.
    Enabled(LoggingTarget),
}

impl LoggingSetting {
    /// Whether the live logging target satisfies this setting.
    #[must_use]
    pub fn matches(&self, live: Option<&LoggingTarget>) -> bool {
        match self {
            LoggingSetting::Disabled => live.is_none(),
            LoggingSetting::Enabled(target) => live == Some(target),
        }
    }

    /// The target to write, `None` to switch logging off.
    #[must_use]
    pub fn target(&self) -> Option<&LoggingTarget> {
        match self {
            LoggingSetting::Disabled => None,
            LoggingSetting::Enabled(target) => Some(target),
        }
    }
}

/// Public access block configuration for a bucket.
///
/// AWS defines exactly four boolean fields for this configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)]
pub struct PublicAccessBlock {
    /// Whether new public ACLs are rejected.
    #[serde(default)]
    pub block_public_acls: bool,
    /// Whether existing public ACLs are ignored.
    #[serde(default)]
    pub ignore_public_acls: bool,
    /// Whether public bucket policies are rejected.
    #[serde(default)]
    pub block_public_policy: bool,
    /// Whether access through public policies is restricted.
    #[serde(default)]
    pub restrict_public_buckets: bool,
}

impl PublicAccessBlock {
    /// All four flags on.
    #[must_use]
    pub fn all_blocked() -> Self {
        Self {
            block_public_acls: true,
            ignore_public_acls: true,
            block_public_policy: true,
            restrict_public_buckets: true,
        }
    }

    /// All four flags off.
    #[must_use]
    pub fn none_blocked() -> Self {
        Self::default()
    }

    /// Whether every flag is on.
    #[must_use]
    pub fn is_fully_blocked(&self) -> bool {
        self.block_public_acls
            && self.ignore_public_acls
            && self.block_public_policy
            && self.restrict_public_buckets
    }

    /// Whether the live configuration satisfies this one. A bucket without a
    /// configuration behaves like one with every flag off.
    #[must_use]
    pub fn matches(&self, live: Option<&PublicAccessBlock>) -> bool {
        *self == live.copied().unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Merge warnings
// ---------------------------------------------------------------------------

/// A user setting the baseline overrode. Surfaced to the operator as a
/// deploy-time warning, never as a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum MergeWarning {
    /// A user tag collided with a mandatory tag.
    #[serde(rename_all = "camelCase")]
    TagOverridden {
        /// Tag key.
        key: String,
        /// The value the user asked for.
        requested: String,
        /// The baseline value that was kept.
        enforced: String,
    },
    /// The user disabled encryption.
    EncryptionForced,
    /// The user asked for a different algorithm than the baseline mandates.
    #[serde(rename_all = "camelCase")]
    EncryptionAlgorithmForced {
        /// Requested algorithm.
        requested: SseAlgorithm,
        /// Baseline algorithm that was kept.
        enforced: SseAlgorithm,
    },
    /// The user asked for public access.
    PublicAccessBlockForced,
    /// Policy statements granting public access were removed.
    #[serde(rename_all = "camelCase")]
    PolicyStatementsRemoved {
        /// Identifiers (`Sid` or position) of the removed statements.
        statements: Vec<String>,
        /// No statement survived, so the policy is not managed this run and
        /// the bucket's current policy stays in place.
        #[serde(default)]
        policy_dropped: bool,
    },
}

impl fmt::Display for MergeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeWarning::TagOverridden {
                key,
                requested,
                enforced,
            } => write!(
                f,
                "tag '{key}' is mandated by the baseline; keeping '{enforced}' instead of '{requested}'"
            ),
            MergeWarning::EncryptionForced => {
                f.write_str("encryption cannot be disabled; default encryption stays on")
            }
            MergeWarning::EncryptionAlgorithmForced {
                requested,
                enforced,
            } => write!(
                f,
                "encryption algorithm '{requested}' overridden by baseline algorithm '{enforced}'"
            ),
            MergeWarning::PublicAccessBlockForced => {
                f.write_str("public access was requested but the baseline blocks all public access")
            }
            MergeWarning::PolicyStatementsRemoved {
                statements,
                policy_dropped,
            } => {
                write!(
                    f,
                    "removed policy statements granting public access: {}",
                    statements.join(", ")
                )?;
                if *policy_dropped {
                    f.write_str(
                        "; no statements remain, so the bucket's existing policy is left unchanged",
                    )?;
                }
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// EffectiveState
// ---------------------------------------------------------------------------

/// Desired state after the baseline merge; the reconciler's target.
///
/// `None` on an optional property means the document did not declare it and
/// the live value is left alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveState {
    /// Bucket name (validated).
    pub bucket_name: String,
    /// Target region.
    pub region: Region,
    /// Default encryption (always on).
    pub encryption: EncryptionSettings,
    /// Whether versioning should be enabled.
    pub versioning: bool,
    /// Access logging, when declared.
    pub logging: Option<LoggingSetting>,
    /// Lifecycle rules, when declared. An empty list removes existing rules.
    pub lifecycle_rules: Option<Vec<LifecycleRule>>,
    /// Complete tag set (baseline + user).
    pub tags: BTreeMap<String, String>,
    /// Public access block flags.
    pub public_access_block: PublicAccessBlock,
    /// Access-policy document, when declared.
    pub policy: Option<serde_json::Value>,
    /// Overrides applied during the merge.
    #[serde(default)]
    pub warnings: Vec<MergeWarning>,
}

// ---------------------------------------------------------------------------
// LiveState
// ---------------------------------------------------------------------------

/// Properties of an existing bucket at probe time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveBucket {
    /// Bucket name.
    pub name: String,
    /// Region the provider reports for the bucket.
    pub region: String,
    /// Default encryption, if configured.
    pub encryption: Option<EncryptionSettings>,
    /// Versioning status.
    pub versioning: VersioningStatus,
    /// Access logging target, if enabled.
    pub logging: Option<LoggingTarget>,
    /// Lifecycle rules (empty when none are configured).
    pub lifecycle_rules: Vec<LifecycleRule>,
    /// Tags (empty when none are set).
    pub tags: BTreeMap<String, String>,
    /// Public access block, if configured.
    pub public_access_block: Option<PublicAccessBlock>,
    /// Raw policy document, if any.
    pub policy: Option<String>,
}

impl LiveBucket {
    /// The state of a bucket that was just created: nothing configured.
    #[must_use]
    pub fn fresh(name: impl Into<String>, region: Region) -> Self {
        Self {
            name: name.into(),
            region: region.as_str().to_owned(),
            encryption: None,
            versioning: VersioningStatus::Disabled,
            logging: None,
            lifecycle_rules: Vec::new(),
            tags: BTreeMap::new(),
            public_access_block: None,
            policy: None,
        }
    }
}

/// Result of probing a bucket name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "state")]
pub enum LiveState {
    /// No bucket with this name exists.
    Absent,
    /// The bucket exists with these properties.
    Present(LiveBucket),
}

impl LiveState {
    /// Whether the bucket exists.
    #[must_use]
    pub fn is_present(&self) -> bool {
        matches!(self, LiveState::Present(_))
    }

    /// The live bucket, if present.
    #[must_use]
    pub fn bucket(&self) -> Option<&LiveBucket> {
        match self {
            LiveState::Absent => None,
            LiveState::Present(bucket) => Some(bucket),
        }
    }
}

// ---------------------------------------------------------------------------
// BucketMeta
// ---------------------------------------------------------------------------

/// Identity of the reconciled bucket; the only state handed back to the
/// pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BucketMeta {
    /// Bucket name.
    pub name: String,
    /// Bucket region.
    pub region: String,
}

impl BucketMeta {
    /// Create a new bucket identity.
    pub fn new(name: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            region: region.into(),
        }
    }
}
