//! Broker configuration.
//!
//! Provides [`BrokerConfig`] for the deployment-step binary. Values are
//! loaded from environment variables, the way the pipeline task hands them
//! to the step.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::retry::RetryPolicy;

/// Deployment-step configuration.
///
/// # Examples
///
/// ```
/// use s3broker_core::config::BrokerConfig;
///
/// let config = BrokerConfig::default();
/// assert_eq!(config.config_file.to_str(), Some("s3.yml"));
/// assert_eq!(config.max_attempts, 5);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct BrokerConfig {
    /// Path of the bucket configuration document.
    #[builder(default = PathBuf::from("s3.yml"))]
    pub config_file: PathBuf,

    /// Path of the baseline task-properties file; the built-in baseline is
    /// used when unset.
    #[builder(default)]
    pub baseline_file: Option<PathBuf>,

    /// Region used when the document does not name one.
    #[builder(default = String::from("us-east-1"))]
    pub default_region: String,

    /// Custom S3 endpoint (e.g. a local emulator).
    #[builder(default)]
    pub endpoint_url: Option<String>,

    /// Whether to use path-style addressing.
    #[builder(default = false)]
    pub force_path_style: bool,

    /// Total attempts per provider call.
    #[builder(default = 5)]
    pub max_attempts: u32,

    /// Delay before the first retry, in milliseconds.
    #[builder(default = 200)]
    pub initial_backoff_ms: u64,

    /// Upper bound on a retry delay, in milliseconds.
    #[builder(default = 10_000)]
    pub max_backoff_ms: u64,

    /// Deadline for a single provider call, in seconds.
    #[builder(default = 30)]
    pub call_timeout_secs: u64,

    /// Where to write the output record as JSON.
    #[builder(default)]
    pub output_file: Option<PathBuf>,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,

    /// Emit logs as JSON lines instead of human-readable text.
    #[builder(default = false)]
    pub log_json: bool,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            config_file: PathBuf::from("s3.yml"),
            baseline_file: None,
            default_region: String::from("us-east-1"),
            endpoint_url: None,
            force_path_style: false,
            max_attempts: 5,
            initial_backoff_ms: 200,
            max_backoff_ms: 10_000,
            call_timeout_secs: 30,
            output_file: None,
            log_level: String::from("info"),
            log_json: false,
        }
    }
}

impl BrokerConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads the following environment variables (falling back to defaults):
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `BROKER_CONFIG_FILE` | `s3.yml` |
    /// | `BROKER_BASELINE_FILE` | unset |
    /// | `AWS_REGION` / `DEFAULT_REGION` | `us-east-1` |
    /// | `S3_ENDPOINT_URL` | unset |
    /// | `S3_FORCE_PATH_STYLE` | `false` |
    /// | `BROKER_MAX_ATTEMPTS` | `5` |
    /// | `BROKER_INITIAL_BACKOFF_MS` | `200` |
    /// | `BROKER_MAX_BACKOFF_MS` | `10000` |
    /// | `BROKER_CALL_TIMEOUT_SECS` | `30` |
    /// | `BROKER_OUTPUT_FILE` | unset |
    /// | `LOG_LEVEL` | `info` |
    /// | `LOG_FORMAT` | `text` (`json` for JSON lines) |
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(v) = var("BROKER_CONFIG_FILE") {
            config.config_file = PathBuf::from(v);
        }
        if let Some(v) = var("BROKER_BASELINE_FILE").filter(|v| !v.is_empty()) {
            config.baseline_file = Some(PathBuf::from(v));
        }
        if let Some(v) = var("AWS_REGION").or_else(|| var("DEFAULT_REGION")) {
            config.default_region = v;
        }
        if let Some(v) = var("S3_ENDPOINT_URL").filter(|v| !v.is_empty()) {
            config.endpoint_url = Some(v);
        }
        if let Some(v) = var("S3_FORCE_PATH_STYLE") {
            config.force_path_style = parse_bool(&v);
        }
        if let Some(n) = var("BROKER_MAX_ATTEMPTS").and_then(|v| v.parse().ok()) {
            config.max_attempts = n;
        }
        if let Some(n) = var("BROKER_INITIAL_BACKOFF_MS").and_then(|v| v.parse().ok()) {
            config.initial_backoff_ms = n;
        }
        if let Some(n) = var("BROKER_MAX_BACKOFF_MS").and_then(|v| v.parse().ok()) {
            config.max_backoff_ms = n;
        }
        if let Some(n) = var("BROKER_CALL_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            config.call_timeout_secs = n;
        }
        if let Some(v) = var("BROKER_OUTPUT_FILE").filter(|v| !v.is_empty()) {
            config.output_file = Some(PathBuf::from(v));
        }
        if let Some(v) = var("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Some(v) = var("LOG_FORMAT") {
            config.log_json = v.eq_ignore_ascii_case("json");
        }

        config
    }

    /// The retry policy these settings describe.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_attempts(self.max_attempts.max(1))
            .with_backoff(
                Duration::from_millis(self.initial_backoff_ms),
                Duration::from_millis(self.max_backoff_ms),
            )
            .with_call_timeout(Duration::from_secs(self.call_timeout_secs))
    }
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_should_create_default_config() {
        let config = BrokerConfig::default();
        assert_eq!(config.config_file, PathBuf::from("s3.yml"));
        assert!(config.baseline_file.is_none());
        assert_eq!(config.default_region, "us-east-1");
        assert!(config.endpoint_url.is_none());
        assert!(!config.force_path_style);
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_should_read_overrides_from_lookup() {
        let config = BrokerConfig::from_lookup(lookup(&[
            ("BROKER_CONFIG_FILE", "deploy/s3.json"),
            ("BROKER_BASELINE_FILE", "baseline.yml"),
            ("DEFAULT_REGION", "eu-west-1"),
            ("S3_ENDPOINT_URL", "http://localhost:4566"),
            ("S3_FORCE_PATH_STYLE", "1"),
            ("BROKER_MAX_ATTEMPTS", "3"),
            ("BROKER_CALL_TIMEOUT_SECS", "not-a-number"),
            ("LOG_LEVEL", "debug"),
            ("LOG_FORMAT", "JSON"),
        ]));
        assert_eq!(config.config_file, PathBuf::from("deploy/s3.json"));
        assert_eq!(config.baseline_file, Some(PathBuf::from("baseline.yml")));
        assert_eq!(config.default_region, "eu-west-1");
        assert_eq!(config.endpoint_url.as_deref(), Some("http://localhost:4566"));
        assert!(config.force_path_style);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.call_timeout_secs, 30);
        assert_eq!(config.log_level, "debug");
        assert!(config.log_json);
    }

    #[test]
    fn test_should_prefer_aws_region() {
        let config = BrokerConfig::from_lookup(lookup(&[
            ("AWS_REGION", "ap-south-1"),
            ("DEFAULT_REGION", "eu-west-1"),
        ]));
        assert_eq!(config.default_region, "ap-south-1");
    }

    #[test]
    fn test_should_build_with_typed_builder() {
        let config = BrokerConfig::builder()
            .config_file(PathBuf::from("bucket.yml"))
            .max_attempts(2)
            .initial_backoff_ms(10)
            .max_backoff_ms(50)
            .call_timeout_secs(5)
            .build();

        let retry = config.retry_policy();
        assert_eq!(retry.max_attempts, 2);
        assert_eq!(retry.initial_backoff, Duration::from_millis(10));
        assert_eq!(retry.max_backoff, Duration::from_millis(50));
        assert_eq!(retry.call_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_should_serialize_to_camel_case_json() {
        let json = serde_json::to_string(&BrokerConfig::default()).expect("test serialization");
        assert!(json.contains("configFile"));
        assert!(json.contains("maxAttempts"));
    }

    #[test]
    fn test_should_parse_bool_values() {
        assert!(parse_bool("1"));
        assert!(parse_bool("TRUE"));
        assert!(!parse_bool("0"));
        assert!(!parse_bool(""));
    }
}
