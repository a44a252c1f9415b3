//! S3 client construction.

use std::fmt;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::config::retry::RetryConfig;
use tracing::debug;
use typed_builder::TypedBuilder;

/// Static credentials handed to the deployment step.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCredentials {
    /// Access key id.
    pub access_key_id: String,
    /// Secret access key.
    pub secret_access_key: String,
    /// Session token for temporary credentials.
    pub session_token: Option<String>,
}

impl fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl SessionCredentials {
    /// Long-lived credentials without a session token.
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    /// Attach a session token.
    #[must_use]
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    /// Read `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and
    /// `AWS_SESSION_TOKEN`. `None` unless both keys are set.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let non_empty = |name: &str| var(name).filter(|v| !v.is_empty());
        let creds = Self::new(
            non_empty("AWS_ACCESS_KEY_ID")?,
            non_empty("AWS_SECRET_ACCESS_KEY")?,
        );
        Some(match non_empty("AWS_SESSION_TOKEN") {
            Some(token) => creds.with_session_token(token),
            None => creds,
        })
    }
}

/// How to reach the provider.
#[derive(Debug, Clone, TypedBuilder)]
pub struct ClientOptions {
    /// Region requests are signed for.
    #[builder(setter(into))]
    pub region: String,

    /// Custom endpoint (e.g. a local emulator).
    #[builder(default, setter(strip_option, into))]
    pub endpoint_url: Option<String>,

    /// Whether to use path-style addressing.
    #[builder(default = false)]
    pub force_path_style: bool,

    /// Explicit credentials; the default provider chain is used when unset.
    #[builder(default, setter(strip_option))]
    pub credentials: Option<SessionCredentials>,
}

/// Build an S3 client.
///
/// With explicit credentials the client is configured directly. Otherwise
/// the standard AWS configuration chain (environment, profile, instance
/// metadata) is loaded. SDK-level retries are always disabled.
pub async fn build_client(options: &ClientOptions) -> Client {
    let region = Region::new(options.region.clone());

    let builder = match &options.credentials {
        Some(creds) => aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(region)
            .credentials_provider(Credentials::new(
                creds.access_key_id.clone(),
                creds.secret_access_key.clone(),
                creds.session_token.clone(),
                None,
                "s3broker",
            )),
        None => {
            let shared = aws_config::defaults(BehaviorVersion::latest())
                .region(region)
                .load()
                .await;
            aws_sdk_s3::config::Builder::from(&shared)
        }
    };

    let mut builder = builder
        .retry_config(RetryConfig::disabled())
        .force_path_style(options.force_path_style);
    if let Some(url) = &options.endpoint_url {
        builder = builder.endpoint_url(url);
    }

    debug!(
        region = %options.region,
        endpoint = ?options.endpoint_url,
        explicit_credentials = options.credentials.is_some(),
        "s3 client configured"
    );
    Client::from_conf(builder.build())
}
