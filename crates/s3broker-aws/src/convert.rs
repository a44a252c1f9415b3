//! Conversions between model values and SDK shapes.

use aws_sdk_s3::error::BuildError;
use aws_sdk_s3::types::{
    BucketLocationConstraint, ExpirationStatus, LifecycleExpiration, LifecycleRuleFilter,
    PublicAccessBlockConfiguration, ServerSideEncryption, ServerSideEncryptionByDefault,
    ServerSideEncryptionConfiguration, ServerSideEncryptionRule, Transition as S3Transition,
    TransitionStorageClass,
};
use s3broker_core::ProviderError;
use s3broker_model::{
    EncryptionSettings, LifecycleRule, PublicAccessBlock, SseAlgorithm, Transition,
};
use tracing::warn;

pub(crate) fn build_error(err: &BuildError) -> ProviderError {
    ProviderError::rejected("InvalidRequest", err.to_string())
}

pub(crate) fn encryption_to_sdk(
    encryption: &EncryptionSettings,
) -> Result<ServerSideEncryptionConfiguration, BuildError> {
    let default = ServerSideEncryptionByDefault::builder()
        .sse_algorithm(ServerSideEncryption::from(encryption.algorithm.as_str()))
        .set_kms_master_key_id(encryption.kms_key_id.clone())
        .build()?;
    let rule = ServerSideEncryptionRule::builder()
        .apply_server_side_encryption_by_default(default)
        .build();
    ServerSideEncryptionConfiguration::builder().rules(rule).build()
}

/// The first rule carrying a default; unknown algorithms read as unset so
/// the reconciler overwrites them.
pub(crate) fn encryption_from_sdk(
    config: &ServerSideEncryptionConfiguration,
) -> Option<EncryptionSettings> {
    let default = config
        .rules()
        .iter()
        .find_map(ServerSideEncryptionRule::apply_server_side_encryption_by_default)?;
    match default.sse_algorithm().as_str().parse::<SseAlgorithm>() {
        Ok(algorithm) => Some(EncryptionSettings {
            algorithm,
            kms_key_id: default.kms_master_key_id().map(str::to_owned),
        }),
        Err(_) => {
            warn!(algorithm = %default.sse_algorithm().as_str(), "unrecognized encryption algorithm");
            None
        }
    }
}

pub(crate) fn lifecycle_rule_to_sdk(
    rule: &LifecycleRule,
) -> Result<aws_sdk_s3::types::LifecycleRule, BuildError> {
    let status = if rule.enabled {
        ExpirationStatus::Enabled
    } else {
        ExpirationStatus::Disabled
    };
    let filter = LifecycleRuleFilter::builder()
        .prefix(rule.prefix.clone().unwrap_or_default())
        .build();

    let mut builder = aws_sdk_s3::types::LifecycleRule::builder()
        .id(&rule.id)
        .status(status)
        .filter(filter);
    if let Some(days) = rule.expiration_days {
        builder = builder.expiration(LifecycleExpiration::builder().days(days).build());
    }
    if let Some(transition) = &rule.transition {
        builder = builder.transitions(
            S3Transition::builder()
                .days(transition.days)
                .storage_class(TransitionStorageClass::from(
                    transition.storage_class.as_str(),
                ))
                .build(),
        );
    }
    builder.build()
}

pub(crate) fn lifecycle_rule_from_sdk(rule: &aws_sdk_s3::types::LifecycleRule) -> LifecycleRule {
    let prefix = rule
        .filter()
        .and_then(LifecycleRuleFilter::prefix)
        .unwrap_or_default();
    let transition = rule.transitions().first().and_then(|t| {
        Some(Transition {
            days: t.days()?,
            storage_class: t.storage_class()?.as_str().to_owned(),
        })
    });
    LifecycleRule {
        id: rule.id().unwrap_or_default().to_owned(),
        prefix: Some(prefix.to_owned()),
        expiration_days: rule.expiration().and_then(LifecycleExpiration::days),
        transition,
        enabled: *rule.status() == ExpirationStatus::Enabled,
    }
}

pub(crate) fn public_access_block_to_sdk(block: &PublicAccessBlock) -> PublicAccessBlockConfiguration {
    PublicAccessBlockConfiguration::builder()
        .block_public_acls(block.block_public_acls)
        .ignore_public_acls(block.ignore_public_acls)
        .block_public_policy(block.block_public_policy)
        .restrict_public_buckets(block.restrict_public_buckets)
        .build()
}

pub(crate) fn public_access_block_from_sdk(
    config: &PublicAccessBlockConfiguration,
) -> PublicAccessBlock {
    PublicAccessBlock {
        block_public_acls: config.block_public_acls().unwrap_or(false),
        ignore_public_acls: config.ignore_public_acls().unwrap_or(false),
        block_public_policy: config.block_public_policy().unwrap_or(false),
        restrict_public_buckets: config.restrict_public_buckets().unwrap_or(false),
    }
}

/// Region named by a `GetBucketLocation` constraint. No constraint means
/// `us-east-1`; the legacy `EU` constraint means `eu-west-1`.
pub(crate) fn location_region(constraint: Option<&BucketLocationConstraint>) -> String {
    match constraint.map(BucketLocationConstraint::as_str) {
        None | Some("") => "us-east-1".to_owned(),
        Some("EU") => "eu-west-1".to_owned(),
        Some(other) => other.to_owned(),
    }
}
