//! Bucket reconciliation engine for s3broker.
//!
//! A run flows through these pieces, in order:
//!
//! - [`document`] -- load and parse the configuration document
//! - [`baseline`] -- fetch the organization baseline
//! - [`merge`] -- combine both into an [`EffectiveState`](s3broker_model::EffectiveState)
//! - [`probe`] -- read the bucket's live state through a [`BucketProvider`]
//! - [`reconcile`] -- converge live state to effective state
//! - [`report`] -- package the bucket identity for the pipeline
//!
//! [`Broker`] wires them together. Provider access goes through the
//! [`BucketProvider`] trait; [`memory::InMemoryProvider`] implements it
//! without a network.

pub mod baseline;
pub mod broker;
pub mod config;
pub mod document;
pub mod error;
pub mod memory;
pub mod merge;
pub mod policy;
pub mod probe;
pub mod provider;
pub mod reconcile;
pub mod report;
pub mod retry;
pub mod validation;

pub use baseline::{BaselineSource, FileBaseline, StaticBaseline};
pub use broker::{Broker, BrokerRun};
pub use config::BrokerConfig;
pub use document::{EnvProperties, PropertySource, load_desired_state};
pub use error::{
    BrokerError, BrokerResult, ConfigurationError, ProbeError, ProviderError, ReconcileError,
    ValidationError,
};
pub use merge::merge;
pub use probe::StateProbe;
pub use provider::{BucketHead, BucketProvider, ProviderResult};
pub use reconcile::{ReconcileReport, Reconciler, StepAction, StepOutcome};
pub use report::{OutputRecord, report};
pub use retry::RetryPolicy;
