//! Names for the independently converged parts of a bucket.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A bucket property the broker reads or writes.
///
/// Used to label probe failures, reconcile failures and report steps so an
/// operator can tell which part of the bucket needs attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BucketProperty {
    /// The bucket itself (existence / creation).
    Bucket,
    /// The region the bucket lives in.
    Region,
    /// Default server-side encryption.
    Encryption,
    /// Object versioning.
    Versioning,
    /// Server access logging.
    Logging,
    /// Lifecycle rules.
    LifecycleRules,
    /// Bucket tags.
    Tags,
    /// Public access block flags.
    PublicAccessBlock,
    /// Access-policy document.
    Policy,
}

impl BucketProperty {
    /// The configuration-document name of this property.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BucketProperty::Bucket => "bucket",
            BucketProperty::Region => "region",
            BucketProperty::Encryption => "encryption",
            BucketProperty::Versioning => "versioning",
            BucketProperty::Logging => "logging",
            BucketProperty::LifecycleRules => "lifecycleRules",
            BucketProperty::Tags => "tags",
            BucketProperty::PublicAccessBlock => "publicAccessBlock",
            BucketProperty::Policy => "policyDocument",
        }
    }
}

impl fmt::Display for BucketProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
