//! In-memory bucket provider.
//!
//! [`InMemoryProvider`] keeps buckets in a `DashMap` with per-property
//! `parking_lot::RwLock`s, records every call in a journal, and can be told
//! to fail specific calls. It backs the reconciler tests (ordering,
//! idempotence, partial failure) and dry runs against no real provider.

use std::collections::{BTreeMap, HashMap, VecDeque};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::{Mutex, RwLock};
use s3broker_model::{
    BucketProperty, EncryptionSettings, LifecycleRule, LiveBucket, LoggingTarget,
    PublicAccessBlock, Region, VersioningStatus,
};
use tracing::{debug, info};

use crate::error::ProviderError;
use crate::policy::find_public_statements;
use crate::provider::{BucketHead, BucketProvider, ProviderResult};

/// A provider operation, as recorded in the journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// Existence check.
    HeadBucket,
    /// Bucket creation.
    CreateBucket,
    /// Read default encryption.
    GetEncryption,
    /// Write default encryption.
    PutEncryption,
    /// Read versioning.
    GetVersioning,
    /// Write versioning.
    PutVersioning,
    /// Read logging.
    GetLogging,
    /// Write logging.
    PutLogging,
    /// Read lifecycle rules.
    GetLifecycleRules,
    /// Write lifecycle rules.
    PutLifecycleRules,
    /// Read tags.
    GetTags,
    /// Write tags.
    PutTags,
    /// Read public access block.
    GetPublicAccessBlock,
    /// Write public access block.
    PutPublicAccessBlock,
    /// Read policy.
    GetPolicy,
    /// Write policy.
    PutPolicy,
}

impl CallKind {
    /// Whether the call changes provider state.
    #[must_use]
    pub fn is_mutation(self) -> bool {
        matches!(
            self,
            CallKind::CreateBucket
                | CallKind::PutEncryption
                | CallKind::PutVersioning
                | CallKind::PutLogging
                | CallKind::PutLifecycleRules
                | CallKind::PutTags
                | CallKind::PutPublicAccessBlock
                | CallKind::PutPolicy
        )
    }

    /// The bucket property the call reads or writes.
    #[must_use]
    pub fn property(self) -> BucketProperty {
        match self {
            CallKind::HeadBucket | CallKind::CreateBucket => BucketProperty::Bucket,
            CallKind::GetEncryption | CallKind::PutEncryption => BucketProperty::Encryption,
            CallKind::GetVersioning | CallKind::PutVersioning => BucketProperty::Versioning,
            CallKind::GetLogging | CallKind::PutLogging => BucketProperty::Logging,
            CallKind::GetLifecycleRules | CallKind::PutLifecycleRules => {
                BucketProperty::LifecycleRules
            }
            CallKind::GetTags | CallKind::PutTags => BucketProperty::Tags,
            CallKind::GetPublicAccessBlock | CallKind::PutPublicAccessBlock => {
                BucketProperty::PublicAccessBlock
            }
            CallKind::GetPolicy | CallKind::PutPolicy => BucketProperty::Policy,
        }
    }
}

/// One journal entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCall {
    /// What was called.
    pub kind: CallKind,
    /// Which bucket it targeted.
    pub bucket: String,
}

/// A bucket held in memory. Properties use interior mutability so a shared
/// `DashMap` reference is enough to update them.
#[derive(Debug)]
struct MemoryBucket {
    region: String,
    encryption: RwLock<Option<EncryptionSettings>>,
    versioning: RwLock<VersioningStatus>,
    logging: RwLock<Option<LoggingTarget>>,
    lifecycle_rules: RwLock<Vec<LifecycleRule>>,
    tags: RwLock<BTreeMap<String, String>>,
    public_access_block: RwLock<Option<PublicAccessBlock>>,
    policy: RwLock<Option<String>>,
}

impl From<LiveBucket> for MemoryBucket {
    fn from(live: LiveBucket) -> Self {
        Self {
            region: live.region,
            encryption: RwLock::new(live.encryption),
            versioning: RwLock::new(live.versioning),
            logging: RwLock::new(live.logging),
            lifecycle_rules: RwLock::new(live.lifecycle_rules),
            tags: RwLock::new(live.tags),
            public_access_block: RwLock::new(live.public_access_block),
            policy: RwLock::new(live.policy),
        }
    }
}

impl MemoryBucket {
    fn snapshot(&self, name: &str) -> LiveBucket {
        LiveBucket {
            name: name.to_owned(),
            region: self.region.clone(),
            encryption: self.encryption.read().clone(),
            versioning: *self.versioning.read(),
            logging: self.logging.read().clone(),
            lifecycle_rules: self.lifecycle_rules.read().clone(),
            tags: self.tags.read().clone(),
            public_access_block: *self.public_access_block.read(),
            policy: self.policy.read().clone(),
        }
    }
}

/// Thread-safe in-memory [`BucketProvider`].
#[derive(Default)]
pub struct InMemoryProvider {
    buckets: DashMap<String, MemoryBucket>,
    journal: Mutex<Vec<ProviderCall>>,
    faults: Mutex<HashMap<CallKind, VecDeque<ProviderError>>>,
}

impl std::fmt::Debug for InMemoryProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryProvider")
            .field("bucket_count", &self.buckets.len())
            .field("call_count", &self.journal.lock().len())
            .finish_non_exhaustive()
    }
}

impl InMemoryProvider {
    /// Create a provider with no buckets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing bucket, replacing any bucket with the same name.
    pub fn insert_bucket(&self, bucket: LiveBucket) {
        let name = bucket.name.clone();
        self.buckets.insert(name, MemoryBucket::from(bucket));
    }

    /// Current state of a bucket, bypassing the journal.
    #[must_use]
    pub fn snapshot(&self, bucket: &str) -> Option<LiveBucket> {
        self.buckets.get(bucket).map(|b| b.snapshot(bucket))
    }

    /// Make the next call of `kind` fail with `error`.
    pub fn fail_next(&self, kind: CallKind, error: ProviderError) {
        self.fail_times(kind, error, 1);
    }

    /// Make the next `times` calls of `kind` fail with `error`.
    pub fn fail_times(&self, kind: CallKind, error: ProviderError, times: usize) {
        let mut faults = self.faults.lock();
        let queue = faults.entry(kind).or_default();
        queue.extend(std::iter::repeat_n(error, times));
    }

    /// All calls so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.journal.lock().clone()
    }

    /// Kinds of all calls so far, in order.
    #[must_use]
    pub fn call_kinds(&self) -> Vec<CallKind> {
        self.journal.lock().iter().map(|c| c.kind).collect()
    }

    /// Number of state-changing calls so far.
    #[must_use]
    pub fn mutation_count(&self) -> usize {
        self.journal
            .lock()
            .iter()
            .filter(|c| c.kind.is_mutation())
            .count()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.journal.lock().clear();
    }

    /// Journal the call and return the injected fault, if any.
    fn record(&self, kind: CallKind, bucket: &str) -> ProviderResult<()> {
        self.journal.lock().push(ProviderCall {
            kind,
            bucket: bucket.to_owned(),
        });
        let fault = self
            .faults
            .lock()
            .get_mut(&kind)
            .and_then(VecDeque::pop_front);
        match fault {
            Some(err) => {
                debug!(bucket, ?kind, error = %err, "injected provider fault");
                Err(err)
            }
            None => Ok(()),
        }
    }

    fn with_bucket<T>(
        &self,
        kind: CallKind,
        bucket: &str,
        f: impl FnOnce(&MemoryBucket) -> ProviderResult<T>,
    ) -> ProviderResult<T> {
        self.record(kind, bucket)?;
        let entry = self
            .buckets
            .get(bucket)
            .ok_or_else(|| ProviderError::NoSuchBucket {
                bucket: bucket.to_owned(),
            })?;
        f(&entry)
    }
}

#[async_trait]
impl BucketProvider for InMemoryProvider {
    async fn head_bucket(&self, bucket: &str) -> ProviderResult<Option<BucketHead>> {
        self.record(CallKind::HeadBucket, bucket)?;
        Ok(self
            .buckets
            .get(bucket)
            .map(|b| BucketHead::in_region(b.region.clone())))
    }

    async fn create_bucket(&self, bucket: &str, region: Region) -> ProviderResult<()> {
        self.record(CallKind::CreateBucket, bucket)?;
        match self.buckets.entry(bucket.to_owned()) {
            Entry::Occupied(_) => Err(ProviderError::BucketAlreadyOwnedByYou {
                bucket: bucket.to_owned(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(MemoryBucket::from(LiveBucket::fresh(bucket, region)));
                info!(bucket, %region, "bucket created");
                Ok(())
            }
        }
    }

    async fn get_encryption(&self, bucket: &str) -> ProviderResult<Option<EncryptionSettings>> {
        self.with_bucket(CallKind::GetEncryption, bucket, |b| {
            Ok(b.encryption.read().clone())
        })
    }

    async fn put_encryption(
        &self,
        bucket: &str,
        encryption: &EncryptionSettings,
    ) -> ProviderResult<()> {
        self.with_bucket(CallKind::PutEncryption, bucket, |b| {
            *b.encryption.write() = Some(encryption.clone());
            Ok(())
        })
    }

    async fn get_versioning(&self, bucket: &str) -> ProviderResult<VersioningStatus> {
        self.with_bucket(CallKind::GetVersioning, bucket, |b| Ok(*b.versioning.read()))
    }

    async fn put_versioning(&self, bucket: &str, enabled: bool) -> ProviderResult<()> {
        self.with_bucket(CallKind::PutVersioning, bucket, |b| {
            *b.versioning.write() = if enabled {
                VersioningStatus::Enabled
            } else {
                VersioningStatus::Suspended
            };
            Ok(())
        })
    }

    async fn get_logging(&self, bucket: &str) -> ProviderResult<Option<LoggingTarget>> {
        self.with_bucket(CallKind::GetLogging, bucket, |b| Ok(b.logging.read().clone()))
    }

    async fn put_logging(
        &self,
        bucket: &str,
        target: Option<&LoggingTarget>,
    ) -> ProviderResult<()> {
        self.with_bucket(CallKind::PutLogging, bucket, |b| {
            *b.logging.write() = target.cloned();
            Ok(())
        })
    }

    async fn get_lifecycle_rules(&self, bucket: &str) -> ProviderResult<Vec<LifecycleRule>> {
        self.with_bucket(CallKind::GetLifecycleRules, bucket, |b| {
            Ok(b.lifecycle_rules.read().clone())
        })
    }

    async fn put_lifecycle_rules(
        &self,
        bucket: &str,
        rules: &[LifecycleRule],
    ) -> ProviderResult<()> {
        self.with_bucket(CallKind::PutLifecycleRules, bucket, |b| {
            *b.lifecycle_rules.write() = rules.to_vec();
            Ok(())
        })
    }

    async fn get_tags(&self, bucket: &str) -> ProviderResult<BTreeMap<String, String>> {
        self.with_bucket(CallKind::GetTags, bucket, |b| Ok(b.tags.read().clone()))
    }

    async fn put_tags(&self, bucket: &str, tags: &BTreeMap<String, String>) -> ProviderResult<()> {
        self.with_bucket(CallKind::PutTags, bucket, |b| {
            *b.tags.write() = tags.clone();
            Ok(())
        })
    }

    async fn get_public_access_block(
        &self,
        bucket: &str,
    ) -> ProviderResult<Option<PublicAccessBlock>> {
        self.with_bucket(CallKind::GetPublicAccessBlock, bucket, |b| {
            Ok(*b.public_access_block.read())
        })
    }

    async fn put_public_access_block(
        &self,
        bucket: &str,
        block: &PublicAccessBlock,
    ) -> ProviderResult<()> {
        self.with_bucket(CallKind::PutPublicAccessBlock, bucket, |b| {
            *b.public_access_block.write() = Some(*block);
            Ok(())
        })
    }

    async fn get_policy(&self, bucket: &str) -> ProviderResult<Option<String>> {
        self.with_bucket(CallKind::GetPolicy, bucket, |b| Ok(b.policy.read().clone()))
    }

    async fn put_policy(&self, bucket: &str, policy: &str) -> ProviderResult<()> {
        self.with_bucket(CallKind::PutPolicy, bucket, |b| {
            let document: serde_json::Value = serde_json::from_str(policy)
                .map_err(|e| ProviderError::rejected("MalformedPolicy", e.to_string()))?;
            let blocks_public = b
                .public_access_block
                .read()
                .is_some_and(|pab| pab.block_public_policy);
            if blocks_public && !find_public_statements(&document).is_empty() {
                return Err(ProviderError::AccessDenied {
                    message: "public policies are blocked by the BlockPublicPolicy setting"
                        .to_owned(),
                });
            }
            *b.policy.write() = Some(policy.to_owned());
            Ok(())
        })
    }
}
