//! Packages the reconciled bucket identity for the pipeline.

use s3broker_model::{BucketMeta, MergeWarning};
use serde::{Deserialize, Serialize};

/// Pipeline variable carrying the bucket name.
pub const NAME_VARIABLE: &str = "s3.brokered.name";

/// Pipeline variable carrying the bucket region.
pub const REGION_VARIABLE: &str = "s3.brokered.region";

/// Stable output of a broker run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputRecord {
    /// Bucket name.
    pub name: String,
    /// Bucket region.
    pub region: String,
    /// Baseline overrides applied to the document.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<MergeWarning>,
}

impl OutputRecord {
    /// Attach merge warnings.
    #[must_use]
    pub fn with_warnings(mut self, warnings: Vec<MergeWarning>) -> Self {
        self.warnings = warnings;
        self
    }

    /// The pipeline variables to publish, in a fixed order.
    #[must_use]
    pub fn variables(&self) -> [(&'static str, &str); 2] {
        [
            (NAME_VARIABLE, self.name.as_str()),
            (REGION_VARIABLE, self.region.as_str()),
        ]
    }
}

/// Map a reconciled bucket to its output record.
#[must_use]
pub fn report(meta: &BucketMeta) -> OutputRecord {
    OutputRecord {
        name: meta.name.clone(),
        region: meta.region.clone(),
        warnings: Vec::new(),
    }
}
