//! Organization security baseline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::desired::SseAlgorithm;

/// Mandatory security configuration that user documents cannot weaken.
///
/// Loaded once per invocation from a baseline source (task properties file,
/// remote object, or the built-in default) and handed to the merger as a
/// plain value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselinePolicy {
    /// Tags that every bucket must carry. Values win over user tags with the
    /// same key.
    #[serde(default)]
    pub mandatory_tags: BTreeMap<String, String>,
    /// Algorithm forced onto every bucket. When `None`, encryption is still
    /// mandatory but the user's choice of algorithm is kept.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_algorithm: Option<SseAlgorithm>,
    /// KMS key used when the effective algorithm is KMS-backed and the user
    /// did not name one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kms_key_id: Option<String>,
    /// Whether every public-access-block flag must be on.
    #[serde(default = "default_true")]
    pub require_public_access_block: bool,
    /// Reject, instead of strip, policy statements that grant public access
    /// while public access is blocked.
    #[serde(default)]
    pub strict_policy_check: bool,
}

impl Default for BaselinePolicy {
    fn default() -> Self {
        Self {
            mandatory_tags: BTreeMap::from([("managed-by".to_owned(), "s3broker".to_owned())]),
            encryption_algorithm: None,
            kms_key_id: None,
            require_public_access_block: true,
            strict_policy_check: false,
        }
    }
}

impl BaselinePolicy {
    /// A baseline with no mandatory tags and default security flags.
    #[must_use]
    pub fn without_tags() -> Self {
        Self {
            mandatory_tags: BTreeMap::new(),
            ..Self::default()
        }
    }

    /// Add a mandatory tag.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.mandatory_tags.insert(key.into(), value.into());
        self
    }
}

fn default_true() -> bool {
    true
}
