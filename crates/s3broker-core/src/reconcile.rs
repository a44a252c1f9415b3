//! Bucket reconciler.
//!
//! Converges a bucket to an [`EffectiveState`] in a fixed order:
//!
//! 1. bucket existence (create when absent)
//! 2. public access block
//! 3. default encryption
//! 4. versioning
//! 5. logging (when declared)
//! 6. tags
//! 7. lifecycle rules (when declared)
//! 8. policy document (when declared)
//!
//! The public access block and encryption always land before the policy.
//! Every step compares against the probed live value first and is skipped
//! when it already matches, so a second run against a converged bucket
//! issues no writes. A failed step aborts the run; earlier steps are not
//! rolled back.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use s3broker_model::{
    BucketMeta, BucketProperty, EffectiveState, LiveBucket, LiveState, VersioningStatus,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ReconcileError};
use crate::probe::StateProbe;
use crate::provider::BucketProvider;
use crate::retry::RetryPolicy;
use crate::validation::RESERVED_TAG_PREFIX;

/// What the reconciler did with one property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StepAction {
    /// The property had no live value and was written.
    Created,
    /// The live value drifted and was overwritten.
    Updated,
    /// The live value already matched.
    Skipped,
}

impl StepAction {
    fn as_str(self) -> &'static str {
        match self {
            StepAction::Created => "created",
            StepAction::Updated => "updated",
            StepAction::Skipped => "skipped",
        }
    }
}

impl fmt::Display for StepAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reconciliation decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    /// The property.
    pub property: BucketProperty,
    /// What happened to it.
    pub action: StepAction,
}

/// Outcome of a successful reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// The converged bucket.
    pub meta: BucketMeta,
    /// Decisions in the order they were made. Undeclared properties are
    /// left untouched and do not appear.
    pub steps: Vec<StepOutcome>,
}

impl ReconcileReport {
    /// Whether any step wrote to the provider.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.steps.iter().any(|s| s.action != StepAction::Skipped)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Drift {
    InSync,
    Missing,
    Changed,
}

impl Drift {
    fn of(in_sync: bool, live_present: bool) -> Self {
        match (in_sync, live_present) {
            (true, _) => Drift::InSync,
            (false, false) => Drift::Missing,
            (false, true) => Drift::Changed,
        }
    }

    fn action(self) -> StepAction {
        match self {
            Drift::InSync => StepAction::Skipped,
            Drift::Missing => StepAction::Created,
            Drift::Changed => StepAction::Updated,
        }
    }
}

/// Drives a bucket from its live state to its effective state.
#[derive(Debug, Clone)]
pub struct Reconciler {
    provider: Arc<dyn BucketProvider>,
    retry: RetryPolicy,
    cancel: Option<CancellationToken>,
}

impl Reconciler {
    /// Create a reconciler over `provider`.
    pub fn new(provider: Arc<dyn BucketProvider>, retry: RetryPolicy) -> Self {
        Self {
            provider,
            retry,
            cancel: None,
        }
    }

    /// Stop issuing provider calls once `token` is cancelled. The call in
    /// flight at that moment is allowed to finish.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Converge the bucket and return its identity.
    ///
    /// # Errors
    ///
    /// See [`Reconciler::reconcile_with_report`].
    pub async fn reconcile(
        &self,
        effective: &EffectiveState,
        live: LiveState,
    ) -> Result<BucketMeta, ReconcileError> {
        self.reconcile_with_report(effective, live)
            .await
            .map(|report| report.meta)
    }

    /// Converge the bucket and return its identity with every decision made.
    ///
    /// # Errors
    ///
    /// - [`ReconcileError::Apply`] when a provider write fails after retries
    /// - [`ReconcileError::RegionMismatch`] when the bucket lives elsewhere
    /// - [`ReconcileError::Probe`] / [`ReconcileError::VanishedAfterCreateConflict`]
    ///   when a create conflict cannot be resolved
    /// - [`ReconcileError::Cancelled`] when the token fires between steps
    pub async fn reconcile_with_report(
        &self,
        effective: &EffectiveState,
        live: LiveState,
    ) -> Result<ReconcileReport, ReconcileError> {
        let bucket = effective.bucket_name.as_str();
        let mut steps = Vec::with_capacity(8);

        let live = self.ensure_bucket(effective, live, &mut steps).await?;
        if live.region != effective.region.as_str() {
            return Err(ReconcileError::RegionMismatch {
                bucket: bucket.to_owned(),
                expected: effective.region.as_str().to_owned(),
                actual: live.region,
            });
        }

        let provider = &self.provider;

        let desired_pab = &effective.public_access_block;
        self.converge(
            bucket,
            BucketProperty::PublicAccessBlock,
            Drift::of(
                desired_pab.matches(live.public_access_block.as_ref()),
                live.public_access_block.is_some(),
            ),
            &mut steps,
            || provider.put_public_access_block(bucket, desired_pab),
        )
        .await?;

        let encryption = &effective.encryption;
        self.converge(
            bucket,
            BucketProperty::Encryption,
            Drift::of(
                live.encryption.as_ref() == Some(encryption),
                live.encryption.is_some(),
            ),
            &mut steps,
            || provider.put_encryption(bucket, encryption),
        )
        .await?;

        let versioning_in_sync = match live.versioning {
            VersioningStatus::Enabled => effective.versioning,
            VersioningStatus::Disabled | VersioningStatus::Suspended => !effective.versioning,
        };
        self.converge(
            bucket,
            BucketProperty::Versioning,
            Drift::of(
                versioning_in_sync,
                live.versioning != VersioningStatus::Disabled,
            ),
            &mut steps,
            || provider.put_versioning(bucket, effective.versioning),
        )
        .await?;

        match &effective.logging {
            Some(logging) => {
                self.converge(
                    bucket,
                    BucketProperty::Logging,
                    Drift::of(logging.matches(live.logging.as_ref()), live.logging.is_some()),
                    &mut steps,
                    || provider.put_logging(bucket, logging.target()),
                )
                .await?;
            }
            None => unmanaged(bucket, BucketProperty::Logging),
        }

        let live_tags = live
            .tags
            .iter()
            .filter(|(key, _)| !key.starts_with(RESERVED_TAG_PREFIX));
        let tags_in_sync = live_tags.clone().eq(effective.tags.iter());
        let live_has_tags = live_tags.count() > 0;
        self.converge(
            bucket,
            BucketProperty::Tags,
            Drift::of(tags_in_sync, live_has_tags),
            &mut steps,
            || provider.put_tags(bucket, &effective.tags),
        )
        .await?;

        match &effective.lifecycle_rules {
            Some(rules) => {
                self.converge(
                    bucket,
                    BucketProperty::LifecycleRules,
                    Drift::of(
                        &live.lifecycle_rules == rules,
                        !live.lifecycle_rules.is_empty(),
                    ),
                    &mut steps,
                    || provider.put_lifecycle_rules(bucket, rules),
                )
                .await?;
            }
            None => unmanaged(bucket, BucketProperty::LifecycleRules),
        }

        match &effective.policy {
            Some(policy) => {
                let live_policy = live
                    .policy
                    .as_deref()
                    .and_then(|raw| serde_json::from_str::<serde_json::Value>(raw).ok());
                let rendered = policy.to_string();
                self.converge(
                    bucket,
                    BucketProperty::Policy,
                    Drift::of(live_policy.as_ref() == Some(policy), live.policy.is_some()),
                    &mut steps,
                    || provider.put_policy(bucket, &rendered),
                )
                .await?;
            }
            None => unmanaged(bucket, BucketProperty::Policy),
        }

        let meta = BucketMeta::new(bucket, live.region);
        info!(
            bucket,
            region = %meta.region,
            steps = steps.len(),
            "bucket reconciled"
        );
        Ok(ReconcileReport { meta, steps })
    }

    /// Make sure the bucket exists, creating it when the probe found none.
    async fn ensure_bucket(
        &self,
        effective: &EffectiveState,
        live: LiveState,
        steps: &mut Vec<StepOutcome>,
    ) -> Result<LiveBucket, ReconcileError> {
        let bucket = effective.bucket_name.as_str();
        let region = effective.region;

        if let LiveState::Present(live) = live {
            record(bucket, BucketProperty::Bucket, StepAction::Skipped, steps);
            return Ok(live);
        }

        self.ensure_not_cancelled(bucket, steps)?;
        let provider = &self.provider;
        let created = self
            .retry
            .run("create_bucket", || provider.create_bucket(bucket, region))
            .await;

        match created {
            Ok(()) => {
                record(bucket, BucketProperty::Bucket, StepAction::Created, steps);
                Ok(LiveBucket::fresh(bucket, region))
            }
            Err(
                ProviderError::BucketAlreadyOwnedByYou { .. }
                | ProviderError::BucketAlreadyExists { .. },
            ) => {
                warn!(bucket, "bucket appeared since the probe; re-probing");
                let probe = StateProbe::new(Arc::clone(&self.provider), self.retry.clone());
                match probe.probe(bucket, region).await? {
                    LiveState::Present(live) => {
                        record(bucket, BucketProperty::Bucket, StepAction::Skipped, steps);
                        Ok(live)
                    }
                    LiveState::Absent => Err(ReconcileError::VanishedAfterCreateConflict {
                        bucket: bucket.to_owned(),
                    }),
                }
            }
            Err(source) => Err(ReconcileError::Apply {
                bucket: bucket.to_owned(),
                property: BucketProperty::Bucket,
                source,
            }),
        }
    }

    async fn converge<F, Fut>(
        &self,
        bucket: &str,
        property: BucketProperty,
        drift: Drift,
        steps: &mut Vec<StepOutcome>,
        call: F,
    ) -> Result<(), ReconcileError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), ProviderError>>,
    {
        self.ensure_not_cancelled(bucket, steps)?;
        if drift != Drift::InSync {
            self.retry
                .run(property.as_str(), call)
                .await
                .map_err(|source| ReconcileError::Apply {
                    bucket: bucket.to_owned(),
                    property,
                    source,
                })?;
        }
        record(bucket, property, drift.action(), steps);
        Ok(())
    }

    fn ensure_not_cancelled(
        &self,
        bucket: &str,
        steps: &[StepOutcome],
    ) -> Result<(), ReconcileError> {
        if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            warn!(bucket, completed = steps.len(), "reconciliation cancelled");
            return Err(ReconcileError::Cancelled {
                bucket: bucket.to_owned(),
                completed: steps.iter().map(|s| s.property).collect(),
            });
        }
        Ok(())
    }
}

fn record(
    bucket: &str,
    property: BucketProperty,
    action: StepAction,
    steps: &mut Vec<StepOutcome>,
) {
    match action {
        StepAction::Skipped => info!(bucket, %property, %action, "already matching"),
        StepAction::Created | StepAction::Updated => info!(bucket, %property, %action, "applied"),
    }
    steps.push(StepOutcome { property, action });
}

fn unmanaged(bucket: &str, property: BucketProperty) {
    debug!(bucket, %property, "not declared; leaving live configuration untouched");
}
