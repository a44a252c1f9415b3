//! Where the organization baseline comes from.

use std::path::PathBuf;

use async_trait::async_trait;
use s3broker_model::{BaselinePolicy, SseAlgorithm};

use crate::document::{EnvProperties, load_document};
use crate::error::ConfigurationError;

/// Supplies the organization baseline for one run.
#[async_trait]
pub trait BaselineSource: Send + Sync + std::fmt::Debug {
    /// Fetch the baseline.
    async fn fetch(&self) -> Result<BaselinePolicy, ConfigurationError>;
}

/// A baseline held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticBaseline(BaselinePolicy);

impl StaticBaseline {
    /// Wrap an existing baseline.
    #[must_use]
    pub fn new(policy: BaselinePolicy) -> Self {
        Self(policy)
    }
}

impl Default for StaticBaseline {
    /// The built-in organization baseline: `AES256`, every public access
    /// flag on, tagged `managed-by=s3broker`.
    fn default() -> Self {
        Self(BaselinePolicy {
            encryption_algorithm: Some(SseAlgorithm::Aes256),
            ..BaselinePolicy::default()
        })
    }
}

#[async_trait]
impl BaselineSource for StaticBaseline {
    async fn fetch(&self) -> Result<BaselinePolicy, ConfigurationError> {
        Ok(self.0.clone())
    }
}

/// A baseline loaded from a YAML or JSON task-properties file. `${name}`
/// placeholders are resolved from the environment.
#[derive(Debug, Clone)]
pub struct FileBaseline {
    path: PathBuf,
}

impl FileBaseline {
    /// Read the baseline from `path` on every fetch.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl BaselineSource for FileBaseline {
    async fn fetch(&self) -> Result<BaselinePolicy, ConfigurationError> {
        load_document(&self.path, &EnvProperties).await
    }
}
