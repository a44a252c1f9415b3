//! Data model for s3broker.
//!
//! Every value that flows through a bucket reconciliation lives here:
//!
//! - [`DesiredState`] -- the deployment configuration document, as written by
//!   the operator
//! - [`BaselinePolicy`] -- the organization security baseline
//! - [`EffectiveState`] -- desired state after the baseline merge
//! - [`LiveState`] / [`LiveBucket`] -- what the provider reports right now
//! - [`BucketMeta`] -- the identity handed back to the pipeline
//!
//! The configuration document schema (camelCase field names) is the one
//! externally visible contract of the broker, so the serde attributes on
//! [`DesiredState`] must stay stable.

mod baseline;
mod desired;
mod property;
mod region;
mod state;

pub use baseline::BaselinePolicy;
pub use desired::{
    DesiredState, EncryptionConfig, LifecycleRule, LoggingConfig, SseAlgorithm, Tag, Transition,
};
pub use property::BucketProperty;
pub use region::{Region, UnsupportedRegion};
pub use state::{
    BucketMeta, EffectiveState, EncryptionSettings, LiveBucket, LiveState, LoggingSetting,
    LoggingTarget, MergeWarning, PublicAccessBlock, VersioningStatus,
};
