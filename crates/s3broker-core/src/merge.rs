//! Policy merger: user document + organization baseline = effective state.
//!
//! The baseline always wins. Overrides that only weaken security (public
//! access, disabled encryption, colliding tags) are applied silently to the
//! bucket but loudly to the operator: each one becomes a [`MergeWarning`]
//! on the effective state and a `warn!` line in the build log.

use s3broker_model::{
    BaselinePolicy, DesiredState, EffectiveState, EncryptionSettings, MergeWarning,
    PublicAccessBlock,
};
use tracing::warn;

use crate::error::ValidationError;
use crate::policy::{find_public_statements, strip_public_statements};
use crate::validation::{
    validate_bucket_name, validate_encryption, validate_lifecycle_rules, validate_logging,
    validate_policy_document, validate_region, validate_tag_count, validate_tag_key,
    validate_tag_value, validate_tags,
};

/// Merge a user document with the baseline.
///
/// # Errors
///
/// Returns a [`ValidationError`] when the document is malformed (empty or
/// invalid bucket name, unsupported region, undefined lifecycle prefix, ...)
/// or, with `strictPolicyCheck`, when the policy grants public access the
/// baseline blocks.
pub fn merge(
    user: DesiredState,
    baseline: &BaselinePolicy,
) -> Result<EffectiveState, ValidationError> {
    validate_bucket_name(&user.bucket_name)?;
    let region = validate_region(user.region.as_deref())?;
    validate_encryption(&user.encryption)?;

    let mut warnings = Vec::new();

    let encryption = merge_encryption(&user, baseline, &mut warnings);

    let logging = user.logging.as_ref().map(validate_logging).transpose()?;

    if let Some(rules) = &user.lifecycle_rules {
        validate_lifecycle_rules(rules)?;
    }

    let mut tags = validate_tags(&user.tags)?;
    for (key, enforced) in &baseline.mandatory_tags {
        validate_tag_key(key)?;
        validate_tag_value(key, enforced)?;
        if let Some(requested) = tags.insert(key.clone(), enforced.clone()) {
            if &requested != enforced {
                warnings.push(MergeWarning::TagOverridden {
                    key: key.clone(),
                    requested,
                    enforced: enforced.clone(),
                });
            }
        }
    }
    validate_tag_count(tags.len())?;

    let public_access_block = if baseline.require_public_access_block {
        if !user.public_access_block {
            warnings.push(MergeWarning::PublicAccessBlockForced);
        }
        PublicAccessBlock::all_blocked()
    } else if user.public_access_block {
        PublicAccessBlock::all_blocked()
    } else {
        PublicAccessBlock::none_blocked()
    };

    let policy = match user.policy_document {
        None => None,
        Some(document) => {
            let document = validate_policy_document(document)?;
            if public_access_block.block_public_policy {
                guard_public_policy(document, baseline, &mut warnings)?
            } else {
                Some(document)
            }
        }
    };

    for warning in &warnings {
        warn!(bucket = %user.bucket_name, "baseline override: {warning}");
    }

    Ok(EffectiveState {
        bucket_name: user.bucket_name,
        region,
        encryption,
        versioning: user.versioning,
        logging,
        lifecycle_rules: user.lifecycle_rules,
        tags,
        public_access_block,
        policy,
        warnings,
    })
}

fn merge_encryption(
    user: &DesiredState,
    baseline: &BaselinePolicy,
    warnings: &mut Vec<MergeWarning>,
) -> EncryptionSettings {
    if !user.encryption.enabled {
        warnings.push(MergeWarning::EncryptionForced);
    }

    let requested = user.encryption.algorithm;
    let algorithm = match baseline.encryption_algorithm {
        Some(enforced) if enforced != requested => {
            if user.encryption.enabled {
                warnings.push(MergeWarning::EncryptionAlgorithmForced {
                    requested,
                    enforced,
                });
            }
            enforced
        }
        Some(enforced) => enforced,
        None => requested,
    };

    let kms_key_id = if algorithm.uses_kms() {
        let user_key = user
            .encryption
            .kms_key_id
            .clone()
            .filter(|_| requested == algorithm);
        user_key.or_else(|| baseline.kms_key_id.clone())
    } else {
        None
    };

    EncryptionSettings {
        algorithm,
        kms_key_id,
    }
}

fn guard_public_policy(
    document: serde_json::Value,
    baseline: &BaselinePolicy,
    warnings: &mut Vec<MergeWarning>,
) -> Result<Option<serde_json::Value>, ValidationError> {
    if baseline.strict_policy_check {
        let statements = find_public_statements(&document);
        if !statements.is_empty() {
            return Err(ValidationError::PublicPolicyConflict { statements });
        }
        return Ok(Some(document));
    }

    let (remaining, removed) = strip_public_statements(document);
    if !removed.is_empty() {
        warnings.push(MergeWarning::PolicyStatementsRemoved {
            statements: removed,
            policy_dropped: remaining.is_none(),
        });
    }
    Ok(remaining)
}

#[cfg(test)]
mod tests {
    use s3broker_model::{LifecycleRule, LoggingConfig, Region, SseAlgorithm, Tag};
    use serde_json::json;

    use super::*;

    fn baseline() -> BaselinePolicy {
        BaselinePolicy::without_tags().with_tag("managed-by", "platform-tooling")
    }

    fn public_policy() -> serde_json::Value {
        json!({
            "Version": "2012-10-17",
            "Statement": [
                {"Sid": "Public", "Effect": "Allow", "Principal": "*", "Action": "s3:GetObject"},
                {"Sid": "Ci", "Effect": "Allow", "Principal": {"AWS": "arn:aws:iam::1:role/ci"}, "Action": "s3:PutObject"}
            ]
        })
    }

    #[test]
    fn test_should_always_force_public_access_block() {
        let mut doc = DesiredState::new("app-logs");
        doc.public_access_block = false;
        let effective = merge(doc, &baseline()).unwrap();
        assert!(effective.public_access_block.is_fully_blocked());
        assert_eq!(
            effective.warnings,
            vec![MergeWarning::PublicAccessBlockForced]
        );
    }

    #[test]
    fn test_should_let_baseline_win_tag_collisions() {
        let mut doc = DesiredState::new("app-logs");
        doc.tags = vec![
            Tag::new("team", "platform"),
            Tag::new("managed-by", "me"),
        ];
        let effective = merge(doc, &baseline()).unwrap();
        assert_eq!(effective.tags["managed-by"], "platform-tooling");
        assert_eq!(effective.tags["team"], "platform");
        assert_eq!(
            effective.warnings,
            vec![MergeWarning::TagOverridden {
                key: "managed-by".to_owned(),
                requested: "me".to_owned(),
                enforced: "platform-tooling".to_owned(),
            }]
        );
    }

    #[test]
    fn test_should_not_warn_when_user_tag_equals_baseline() {
        let mut doc = DesiredState::new("app-logs");
        doc.tags = vec![Tag::new("managed-by", "platform-tooling")];
        let effective = merge(doc, &baseline()).unwrap();
        assert!(effective.warnings.is_empty());
    }

    #[test]
    fn test_should_force_encryption_on() {
        let mut doc = DesiredState::new("app-logs");
        doc.encryption.enabled = false;
        let effective = merge(doc, &baseline()).unwrap();
        assert_eq!(effective.encryption.algorithm, SseAlgorithm::Aes256);
        assert_eq!(effective.warnings, vec![MergeWarning::EncryptionForced]);
    }

    #[test]
    fn test_should_apply_baseline_algorithm_and_key() {
        let mut policy = baseline();
        policy.encryption_algorithm = Some(SseAlgorithm::AwsKms);
        policy.kms_key_id = Some("alias/org".to_owned());

        let effective = merge(DesiredState::new("app-logs"), &policy).unwrap();
        assert_eq!(effective.encryption.algorithm, SseAlgorithm::AwsKms);
        assert_eq!(effective.encryption.kms_key_id.as_deref(), Some("alias/org"));
        assert_eq!(
            effective.warnings,
            vec![MergeWarning::EncryptionAlgorithmForced {
                requested: SseAlgorithm::Aes256,
                enforced: SseAlgorithm::AwsKms,
            }]
        );
    }

    #[test]
    fn test_should_keep_user_kms_key() {
        let mut doc = DesiredState::new("app-logs");
        doc.encryption.algorithm = SseAlgorithm::AwsKms;
        doc.encryption.kms_key_id = Some("alias/app".to_owned());
        let mut policy = baseline();
        policy.kms_key_id = Some("alias/org".to_owned());

        let effective = merge(doc, &policy).unwrap();
        assert_eq!(effective.encryption.kms_key_id.as_deref(), Some("alias/app"));
        assert!(effective.warnings.is_empty());
    }

    #[test]
    fn test_should_default_region_and_reject_unsupported() {
        let effective = merge(DesiredState::new("app-logs"), &baseline()).unwrap();
        assert_eq!(effective.region, Region::UsEast1);

        let mut doc = DesiredState::new("app-logs");
        doc.region = Some("mars-1".to_owned());
        assert!(matches!(
            merge(doc, &baseline()),
            Err(ValidationError::UnsupportedRegion { .. })
        ));
    }

    #[test]
    fn test_should_reject_empty_bucket_name() {
        assert_eq!(
            merge(DesiredState::new(""), &baseline()),
            Err(ValidationError::EmptyBucketName)
        );
    }

    #[test]
    fn test_should_reject_undefined_lifecycle_prefix() {
        let mut doc = DesiredState::new("app-logs");
        doc.lifecycle_rules = Some(vec![LifecycleRule {
            id: "tmp".to_owned(),
            prefix: None,
            expiration_days: Some(7),
            transition: None,
            enabled: true,
        }]);
        assert!(matches!(
            merge(doc, &baseline()),
            Err(ValidationError::UndefinedLifecyclePrefix { .. })
        ));
    }

    #[test]
    fn test_should_reject_too_many_tags_after_merge() {
        let mut doc = DesiredState::new("app-logs");
        doc.tags = (0..50).map(|i| Tag::new(format!("k{i}"), "v")).collect();
        assert!(matches!(
            merge(doc, &baseline()),
            Err(ValidationError::TooManyTags { count: 51, .. })
        ));
    }

    #[test]
    fn test_should_strip_public_policy_statements_by_default() {
        let mut doc = DesiredState::new("app-logs");
        doc.policy_document = Some(public_policy());
        let effective = merge(doc, &baseline()).unwrap();

        let policy = effective.policy.unwrap();
        let statements = policy["Statement"].as_array().unwrap();
        assert_eq!(statements.len(), 1);
        assert_eq!(statements[0]["Sid"], "Ci");
        assert_eq!(
            effective.warnings,
            vec![MergeWarning::PolicyStatementsRemoved {
                statements: vec!["Public".to_owned()],
                policy_dropped: false,
            }]
        );
    }

    #[test]
    fn test_should_flag_policy_left_unmanaged_when_every_statement_is_public() {
        let mut doc = DesiredState::new("app-logs");
        doc.policy_document = Some(json!({
            "Version": "2012-10-17",
            "Statement": [
                {"Sid": "Public", "Effect": "Allow", "Principal": "*", "Action": "s3:GetObject"}
            ]
        }));
        let effective = merge(doc, &baseline()).unwrap();

        assert_eq!(effective.policy, None);
        let warning = MergeWarning::PolicyStatementsRemoved {
            statements: vec!["Public".to_owned()],
            policy_dropped: true,
        };
        assert_eq!(effective.warnings, vec![warning.clone()]);
        assert!(
            warning
                .to_string()
                .contains("existing policy is left unchanged")
        );
    }

    #[test]
    fn test_should_reject_public_policy_in_strict_mode() {
        let mut policy = baseline();
        policy.strict_policy_check = true;
        let mut doc = DesiredState::new("app-logs");
        doc.policy_document = Some(public_policy());
        assert_eq!(
            merge(doc, &policy),
            Err(ValidationError::PublicPolicyConflict {
                statements: vec!["Public".to_owned()],
            })
        );
    }

    #[test]
    fn test_should_keep_public_policy_when_baseline_allows_public_access() {
        let mut policy = baseline();
        policy.require_public_access_block = false;
        let mut doc = DesiredState::new("app-logs");
        doc.public_access_block = false;
        doc.policy_document = Some(public_policy());

        let effective = merge(doc, &policy).unwrap();
        assert_eq!(effective.public_access_block, PublicAccessBlock::none_blocked());
        assert_eq!(effective.policy, Some(public_policy()));
        assert!(effective.warnings.is_empty());
    }

    #[test]
    fn test_should_carry_declared_logging() {
        let mut doc = DesiredState::new("app-logs");
        doc.logging = Some(LoggingConfig {
            enabled: true,
            target_bucket: None,
            target_prefix: None,
        });
        assert_eq!(
            merge(doc, &baseline()),
            Err(ValidationError::MissingLoggingTarget)
        );

        let effective = merge(DesiredState::new("app-logs"), &baseline()).unwrap();
        assert!(effective.logging.is_none());
    }
}
