//! Error types for bucket brokering.
//!
//! Each stage of a run has its own error type so the caller can tell a bad
//! document ([`ValidationError`], [`ConfigurationError`]) from a provider that
//! could not be read ([`ProbeError`]) or written ([`ReconcileError`]).
//! [`BrokerError`] collects all four for the deployment-step binary, which
//! maps any of them to a non-zero exit.

use std::path::PathBuf;

use s3broker_model::BucketProperty;

/// Result alias for a full broker run.
pub type BrokerResult<T> = Result<T, BrokerError>;

// ---------------------------------------------------------------------------
// Provider errors
// ---------------------------------------------------------------------------

/// A failed provider call, classified for retry decisions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The bucket does not exist.
    #[error("The specified bucket does not exist: {bucket}")]
    NoSuchBucket {
        /// The bucket name that was not found.
        bucket: String,
    },

    /// The bucket already exists and is owned by the caller.
    #[error("Bucket already exists and is owned by you: {bucket}")]
    BucketAlreadyOwnedByYou {
        /// The bucket name.
        bucket: String,
    },

    /// The bucket name is taken by another account.
    #[error("The requested bucket name is not available: {bucket}")]
    BucketAlreadyExists {
        /// The bucket name.
        bucket: String,
    },

    /// The credentials are not allowed to perform the call.
    #[error("Access denied: {message}")]
    AccessDenied {
        /// Provider message.
        message: String,
    },

    /// The provider asked the caller to slow down.
    #[error("Request throttled: {message}")]
    Throttled {
        /// Provider message.
        message: String,
    },

    /// The provider is temporarily unavailable.
    #[error("Service unavailable: {message}")]
    Unavailable {
        /// Provider message.
        message: String,
    },

    /// The call did not complete within its deadline.
    #[error("Request timed out: {message}")]
    Timeout {
        /// What timed out.
        message: String,
    },

    /// The request never reached the provider or the response was lost.
    #[error("Network error: {message}")]
    Network {
        /// Transport message.
        message: String,
    },

    /// Any other provider rejection.
    #[error("{code}: {message}")]
    Rejected {
        /// Provider error code.
        code: String,
        /// Provider message.
        message: String,
    },
}

impl ProviderError {
    /// Whether retrying the same call may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::Throttled { .. }
                | ProviderError::Unavailable { .. }
                | ProviderError::Timeout { .. }
                | ProviderError::Network { .. }
        )
    }

    /// Shorthand for [`ProviderError::Rejected`].
    pub fn rejected(code: impl Into<String>, message: impl Into<String>) -> Self {
        ProviderError::Rejected {
            code: code.into(),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation errors
// ---------------------------------------------------------------------------

/// The desired state is malformed or contradicts the baseline. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// `bucketName` is missing or empty.
    #[error("bucketName must not be empty")]
    EmptyBucketName,

    /// The bucket name breaks a naming rule.
    #[error("Invalid bucket name: {name}: {reason}")]
    InvalidBucketName {
        /// The invalid bucket name.
        name: String,
        /// The rule that was broken.
        reason: String,
    },

    /// The region is not in the supported set.
    #[error("Unsupported region: {region}")]
    UnsupportedRegion {
        /// The requested region.
        region: String,
    },

    /// A tag key or value is invalid.
    #[error("Invalid tag '{key}': {reason}")]
    InvalidTag {
        /// The offending tag key.
        key: String,
        /// The rule that was broken.
        reason: String,
    },

    /// The same tag key appears twice in the document.
    #[error("Duplicate tag key: {key}")]
    DuplicateTagKey {
        /// The repeated key.
        key: String,
    },

    /// More tags than a bucket can carry.
    #[error("Too many tags: {count} (maximum {max})")]
    TooManyTags {
        /// Number of tags after the baseline merge.
        count: usize,
        /// Provider limit.
        max: usize,
    },

    /// A lifecycle rule is inconsistent.
    #[error("Invalid lifecycle rule '{id}': {reason}")]
    InvalidLifecycleRule {
        /// Rule id (may be empty).
        id: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A lifecycle rule does not define the prefix it applies to.
    #[error("Lifecycle rule '{id}' references an undefined prefix")]
    UndefinedLifecyclePrefix {
        /// Rule id.
        id: String,
    },

    /// Two lifecycle rules share an id.
    #[error("Duplicate lifecycle rule id: {id}")]
    DuplicateLifecycleRuleId {
        /// The repeated id.
        id: String,
    },

    /// Logging is enabled without a target bucket.
    #[error("logging.enabled requires logging.targetBucket")]
    MissingLoggingTarget,

    /// The encryption block is inconsistent.
    #[error("Invalid encryption configuration: {reason}")]
    InvalidEncryption {
        /// What is wrong with it.
        reason: String,
    },

    /// The policy document is not a JSON object.
    #[error("Invalid policy document: {reason}")]
    InvalidPolicyDocument {
        /// What is wrong with it.
        reason: String,
    },

    /// The policy grants public access while the baseline blocks it.
    #[error(
        "Policy statements grant public access while public access is blocked: {}",
        .statements.join(", ")
    )]
    PublicPolicyConflict {
        /// Identifiers of the offending statements.
        statements: Vec<String>,
    },
}

// ---------------------------------------------------------------------------
// Probe errors
// ---------------------------------------------------------------------------

/// Reading live state failed. Distinct from the bucket being absent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Failed to read {property} of bucket {bucket}: {source}")]
pub struct ProbeError {
    /// Bucket being probed.
    pub bucket: String,
    /// Property whose read failed.
    pub property: BucketProperty,
    /// Underlying provider failure (after retries).
    #[source]
    pub source: ProviderError,
}

// ---------------------------------------------------------------------------
// Reconcile errors
// ---------------------------------------------------------------------------

/// Converging the bucket failed. Properties applied before the failure stay
/// applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    /// Applying a property failed after retries.
    #[error("Failed to apply {property} to bucket {bucket}: {source}")]
    Apply {
        /// Bucket being reconciled.
        bucket: String,
        /// Property whose apply failed.
        property: BucketProperty,
        /// Underlying provider failure.
        #[source]
        source: ProviderError,
    },

    /// The bucket exists in a different region.
    #[error("Bucket {bucket} exists in region {actual}, expected {expected}")]
    RegionMismatch {
        /// Bucket name.
        bucket: String,
        /// Desired region.
        expected: String,
        /// Region the provider reports.
        actual: String,
    },

    /// Re-probing after a create conflict failed.
    #[error(transparent)]
    Probe(#[from] ProbeError),

    /// Creation reported the bucket as existing, yet a re-probe found nothing.
    #[error("Bucket {bucket} reported as existing on create but is absent on re-probe")]
    VanishedAfterCreateConflict {
        /// Bucket name.
        bucket: String,
    },

    /// The run was cancelled between two provider calls.
    #[error("Reconciliation of bucket {bucket} cancelled after {} step(s)", .completed.len())]
    Cancelled {
        /// Bucket name.
        bucket: String,
        /// Properties fully processed before cancellation.
        completed: Vec<BucketProperty>,
    },
}

impl ReconcileError {
    /// The property this error is about.
    #[must_use]
    pub fn property(&self) -> Option<BucketProperty> {
        match self {
            ReconcileError::Apply { property, .. } => Some(*property),
            ReconcileError::RegionMismatch { .. } => Some(BucketProperty::Region),
            ReconcileError::Probe(err) => Some(err.property),
            ReconcileError::VanishedAfterCreateConflict { .. } => Some(BucketProperty::Bucket),
            ReconcileError::Cancelled { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// A configuration document or baseline could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    /// The file could not be read.
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        /// File path.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The file is not a valid document.
    #[error("Failed to parse {location}: {message}")]
    Parse {
        /// Where the document came from.
        location: String,
        /// Parser message.
        message: String,
    },

    /// A `${name}` placeholder has no value.
    #[error("Unresolved property '${{{name}}}' in {location}")]
    UnresolvedProperty {
        /// Placeholder name.
        name: String,
        /// Where the document came from.
        location: String,
    },

    /// A configuration value is out of range.
    #[error("Invalid value for {name}: {value}")]
    InvalidValue {
        /// Setting name.
        name: String,
        /// The rejected value.
        value: String,
    },

    /// A remote document could not be fetched.
    #[error("Failed to fetch {location}: {source}")]
    Fetch {
        /// Remote location.
        location: String,
        /// Provider failure.
        #[source]
        source: ProviderError,
    },
}

// ---------------------------------------------------------------------------
// Umbrella
// ---------------------------------------------------------------------------

/// Any failure of a broker run.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// Document or baseline loading failed.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    /// The desired state is invalid.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Live state could not be read.
    #[error(transparent)]
    Probe(#[from] ProbeError),
    /// The bucket could not be converged.
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}
