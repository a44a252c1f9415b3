//! One deployment-step run, end to end.

use std::path::Path;
use std::sync::Arc;

use s3broker_model::DesiredState;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::baseline::BaselineSource;
use crate::document::{PropertySource, load_desired_state};
use crate::error::{BrokerResult, ReconcileError};
use crate::merge::merge;
use crate::probe::StateProbe;
use crate::provider::BucketProvider;
use crate::reconcile::{ReconcileReport, Reconciler};
use crate::report::{OutputRecord, report};
use crate::retry::RetryPolicy;

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerRun {
    /// What the pipeline publishes.
    pub output: OutputRecord,
    /// Every reconciliation decision.
    pub report: ReconcileReport,
}

/// Wires document loading, baseline merge, probe, reconcile and report.
///
/// Collaborators are passed in explicitly; nothing is read from global
/// state.
#[derive(Debug, Clone)]
pub struct Broker {
    provider: Arc<dyn BucketProvider>,
    baseline: Arc<dyn BaselineSource>,
    retry: RetryPolicy,
    default_region: Option<String>,
    cancel: Option<CancellationToken>,
}

impl Broker {
    /// Create a broker.
    pub fn new(
        provider: Arc<dyn BucketProvider>,
        baseline: Arc<dyn BaselineSource>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            provider,
            baseline,
            retry,
            default_region: None,
            cancel: None,
        }
    }

    /// Region for documents that do not name one (the invocation's region).
    #[must_use]
    pub fn with_default_region(mut self, region: impl Into<String>) -> Self {
        self.default_region = Some(region.into());
        self
    }

    /// Stop between provider calls once `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Load the document at `document` and converge its bucket.
    ///
    /// # Errors
    ///
    /// Any [`crate::BrokerError`]: configuration, validation, probe or
    /// reconcile failure.
    pub async fn run(
        &self,
        document: &Path,
        properties: &dyn PropertySource,
    ) -> BrokerResult<BrokerRun> {
        let desired = load_desired_state(document, properties).await?;
        self.run_document(desired).await
    }

    /// Converge the bucket an already parsed document describes.
    ///
    /// # Errors
    ///
    /// See [`Broker::run`].
    #[instrument(skip_all, fields(bucket = %desired.bucket_name))]
    pub async fn run_document(&self, desired: DesiredState) -> BrokerResult<BrokerRun> {
        let desired = match &self.default_region {
            Some(region) => desired.with_default_region(region),
            None => desired,
        };

        let baseline = self.baseline.fetch().await?;
        let effective = merge(desired, &baseline)?;

        if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Err(ReconcileError::Cancelled {
                bucket: effective.bucket_name,
                completed: Vec::new(),
            }
            .into());
        }

        let probe = StateProbe::new(Arc::clone(&self.provider), self.retry.clone());
        let live = probe
            .probe(&effective.bucket_name, effective.region)
            .await?;

        let mut reconciler = Reconciler::new(Arc::clone(&self.provider), self.retry.clone());
        if let Some(token) = &self.cancel {
            reconciler = reconciler.with_cancellation(token.clone());
        }
        let outcome = reconciler.reconcile_with_report(&effective, live).await?;

        let output = report(&outcome.meta).with_warnings(effective.warnings);
        info!(
            name = %output.name,
            region = %output.region,
            changed = outcome.changed(),
            warnings = output.warnings.len(),
            "bucket brokered"
        );
        Ok(BrokerRun {
            output,
            report: outcome,
        })
    }
}
