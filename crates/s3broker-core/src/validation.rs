//! Validation for configuration documents.
//!
//! Provides validation functions for bucket names, regions, tags, lifecycle
//! rules, logging, encryption and policy documents following the rules
//! defined in the
//! [Amazon S3 documentation](https://docs.aws.amazon.com/AmazonS3/latest/userguide/bucketnamingrules.html).

use std::collections::{BTreeMap, HashSet};
use std::net::Ipv4Addr;

use s3broker_model::{
    EncryptionConfig, LifecycleRule, LoggingConfig, LoggingSetting, LoggingTarget, Region, Tag,
};

use crate::error::ValidationError;

/// Maximum number of tags allowed on a single bucket.
pub const MAX_TAGS: usize = 50;

/// Maximum length of a tag key in characters.
const MAX_TAG_KEY_LEN: usize = 128;

/// Maximum length of a tag value in characters.
const MAX_TAG_VALUE_LEN: usize = 256;

/// Reserved tag key prefix.
pub const RESERVED_TAG_PREFIX: &str = "aws:";

/// Minimum bucket name length.
const MIN_BUCKET_NAME_LEN: usize = 3;

/// Maximum bucket name length.
const MAX_BUCKET_NAME_LEN: usize = 63;

/// Validate a bucket name.
///
/// Rules (per AWS documentation):
/// - 3-63 characters long
/// - Only lowercase letters, numbers, hyphens, and dots
/// - Must start and end with a letter or number
/// - No consecutive dots (`..`)
/// - Not formatted as an IPv4 address (e.g. `192.168.0.1`)
/// - Must not start with `xn--`
/// - Must not end with `-s3alias`
/// - Must not start with `sthree-`
///
/// # Errors
///
/// Returns [`ValidationError::EmptyBucketName`] for an empty name and
/// [`ValidationError::InvalidBucketName`] if any other rule is violated.
///
/// # Examples
///
/// ```
/// use s3broker_core::validation::validate_bucket_name;
///
/// assert!(validate_bucket_name("my-valid-bucket").is_ok());
/// assert!(validate_bucket_name("AB").is_err());
/// ```
pub fn validate_bucket_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyBucketName);
    }

    let invalid = |reason: &str| ValidationError::InvalidBucketName {
        name: name.to_owned(),
        reason: reason.to_owned(),
    };

    let len = name.len();
    if !(MIN_BUCKET_NAME_LEN..=MAX_BUCKET_NAME_LEN).contains(&len) {
        return Err(ValidationError::InvalidBucketName {
            name: name.to_owned(),
            reason: format!(
                "Bucket name must be between {MIN_BUCKET_NAME_LEN} and {MAX_BUCKET_NAME_LEN} characters long"
            ),
        });
    }

    if !name
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'.')
    {
        return Err(invalid(
            "Bucket name must only contain lowercase letters, numbers, hyphens, and dots",
        ));
    }

    let first = name.as_bytes()[0];
    let last = name.as_bytes()[len - 1];
    if !(first.is_ascii_lowercase() || first.is_ascii_digit())
        || !(last.is_ascii_lowercase() || last.is_ascii_digit())
    {
        return Err(invalid("Bucket name must start and end with a letter or number"));
    }

    if name.contains("..") {
        return Err(invalid("Bucket name must not contain consecutive dots"));
    }

    if name.parse::<Ipv4Addr>().is_ok() {
        return Err(invalid("Bucket name must not be formatted as an IP address"));
    }

    if name.starts_with("xn--") {
        return Err(invalid("Bucket name must not start with 'xn--'"));
    }

    if name.ends_with("-s3alias") {
        return Err(invalid("Bucket name must not end with '-s3alias'"));
    }

    if name.starts_with("sthree-") {
        return Err(invalid("Bucket name must not start with 'sthree-'"));
    }

    Ok(())
}

/// Resolve the document's region, falling back to the provider default.
///
/// # Errors
///
/// Returns [`ValidationError::UnsupportedRegion`] for identifiers outside the
/// supported set.
pub fn validate_region(region: Option<&str>) -> Result<Region, ValidationError> {
    match region.map(str::trim) {
        None | Some("") => Ok(Region::default()),
        Some(id) => id
            .parse()
            .map_err(|_| ValidationError::UnsupportedRegion {
                region: id.to_owned(),
            }),
    }
}

/// Validate a tag key.
///
/// Rules:
/// - 1-128 characters
/// - Must not start with the reserved `aws:` prefix
///
/// # Errors
///
/// Returns [`ValidationError::InvalidTag`] if the key is invalid.
pub fn validate_tag_key(key: &str) -> Result<(), ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidTag {
        key: key.to_owned(),
        reason,
    };
    if key.is_empty() {
        return Err(invalid("Tag key must not be empty".to_owned()));
    }
    if key.chars().count() > MAX_TAG_KEY_LEN {
        return Err(invalid(format!(
            "Tag key must be at most {MAX_TAG_KEY_LEN} characters"
        )));
    }
    if key.starts_with(RESERVED_TAG_PREFIX) {
        return Err(invalid(format!(
            "Tag key must not start with the reserved prefix '{RESERVED_TAG_PREFIX}'"
        )));
    }
    Ok(())
}

/// Validate a tag value (0-256 characters).
///
/// # Errors
///
/// Returns [`ValidationError::InvalidTag`] if the value is too long.
pub fn validate_tag_value(key: &str, value: &str) -> Result<(), ValidationError> {
    if value.chars().count() > MAX_TAG_VALUE_LEN {
        return Err(ValidationError::InvalidTag {
            key: key.to_owned(),
            reason: format!("Tag value must be at most {MAX_TAG_VALUE_LEN} characters"),
        });
    }
    Ok(())
}

/// Validate the document's tag list and collapse it into a map.
///
/// # Errors
///
/// Returns [`ValidationError::DuplicateTagKey`] when a key repeats, or
/// [`ValidationError::InvalidTag`] for an invalid key or value.
pub fn validate_tags(tags: &[Tag]) -> Result<BTreeMap<String, String>, ValidationError> {
    let mut map = BTreeMap::new();
    for tag in tags {
        validate_tag_key(&tag.key)?;
        validate_tag_value(&tag.key, &tag.value)?;
        if map.insert(tag.key.clone(), tag.value.clone()).is_some() {
            return Err(ValidationError::DuplicateTagKey {
                key: tag.key.clone(),
            });
        }
    }
    Ok(map)
}

/// Check the final tag count against the provider limit.
///
/// # Errors
///
/// Returns [`ValidationError::TooManyTags`] above [`MAX_TAGS`].
pub fn validate_tag_count(count: usize) -> Result<(), ValidationError> {
    if count > MAX_TAGS {
        return Err(ValidationError::TooManyTags {
            count,
            max: MAX_TAGS,
        });
    }
    Ok(())
}

/// Validate lifecycle rules.
///
/// Each rule needs a unique non-empty id, a prefix (empty targets the whole
/// bucket), and an action: positive `expirationDays` or a transition.
///
/// # Errors
///
/// Returns the first rule problem found, in document order.
pub fn validate_lifecycle_rules(rules: &[LifecycleRule]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for rule in rules {
        let invalid = |reason: &str| ValidationError::InvalidLifecycleRule {
            id: rule.id.clone(),
            reason: reason.to_owned(),
        };

        if rule.id.trim().is_empty() {
            return Err(invalid("Rule id must not be empty"));
        }
        if !seen.insert(rule.id.as_str()) {
            return Err(ValidationError::DuplicateLifecycleRuleId {
                id: rule.id.clone(),
            });
        }
        if rule.prefix.is_none() {
            return Err(ValidationError::UndefinedLifecyclePrefix {
                id: rule.id.clone(),
            });
        }
        if rule.expiration_days.is_none() && rule.transition.is_none() {
            return Err(invalid("Rule needs expirationDays or a transition"));
        }
        if rule.expiration_days.is_some_and(|days| days <= 0) {
            return Err(invalid("expirationDays must be greater than zero"));
        }
        if let Some(transition) = &rule.transition {
            if transition.days < 0 {
                return Err(invalid("Transition days must not be negative"));
            }
            if transition.storage_class.trim().is_empty() {
                return Err(invalid("Transition storage class must not be empty"));
            }
        }
    }
    Ok(())
}

/// Validate the logging block and turn it into the setting to converge to.
///
/// # Errors
///
/// Returns [`ValidationError::MissingLoggingTarget`] when logging is enabled
/// without a target bucket.
pub fn validate_logging(logging: &LoggingConfig) -> Result<LoggingSetting, ValidationError> {
    if !logging.enabled {
        return Ok(LoggingSetting::Disabled);
    }
    let bucket = logging
        .target_bucket
        .as_deref()
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .ok_or(ValidationError::MissingLoggingTarget)?;
    Ok(LoggingSetting::Enabled(LoggingTarget {
        bucket: bucket.to_owned(),
        prefix: logging.target_prefix.clone().unwrap_or_default(),
    }))
}

/// Validate the encryption block.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidEncryption`] when `AES256` carries a
/// KMS key id.
pub fn validate_encryption(encryption: &EncryptionConfig) -> Result<(), ValidationError> {
    if encryption.kms_key_id.is_some() && !encryption.algorithm.uses_kms() {
        return Err(ValidationError::InvalidEncryption {
            reason: format!(
                "kmsKeyId is only valid with a KMS algorithm, not {}",
                encryption.algorithm
            ),
        });
    }
    Ok(())
}

/// Validate a policy document. A JSON string holding the document is
/// accepted and parsed.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidPolicyDocument`] unless the document is
/// a JSON object.
pub fn validate_policy_document(
    document: serde_json::Value,
) -> Result<serde_json::Value, ValidationError> {
    let document = match document {
        serde_json::Value::String(raw) => serde_json::from_str(&raw).map_err(|e| {
            ValidationError::InvalidPolicyDocument {
                reason: e.to_string(),
            }
        })?,
        other => other,
    };
    if !document.is_object() {
        return Err(ValidationError::InvalidPolicyDocument {
            reason: "Policy document must be a JSON object".to_owned(),
        });
    }
    Ok(document)
}
