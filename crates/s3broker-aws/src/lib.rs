//! AWS S3 implementation of the s3broker provider seam.
//!
//! [`AwsBucketProvider`] maps every [`BucketProvider`](s3broker_core::BucketProvider)
//! call onto one `aws-sdk-s3` request. The SDK's own retry layer is disabled
//! so that [`RetryPolicy`](s3broker_core::RetryPolicy) is the only place
//! that decides whether a call is attempted again.

pub mod baseline;
pub mod client;
mod convert;
pub mod error;
pub mod provider;

pub use aws_sdk_s3::Client;
pub use baseline::{S3BaselineSource, S3Location};
pub use client::{ClientOptions, SessionCredentials, build_client};
pub use error::classify;
pub use provider::AwsBucketProvider;
