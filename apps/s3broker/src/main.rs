//! s3broker - S3 bucket provisioning step for deployment pipelines.
//!
//! Reads a bucket configuration document, merges it with the organization
//! baseline, converges the bucket and publishes its identity as pipeline
//! variables on stdout.
//!
//! # Usage
//!
//! ```text
//! BROKER_CONFIG_FILE=deploy/s3.yml AWS_REGION=eu-west-1 s3broker
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `BROKER_CONFIG_FILE` | `s3.yml` | Bucket configuration document |
//! | `BROKER_BASELINE_FILE` | *(unset)* | Baseline file path or `s3://bucket/key` |
//! | `AWS_REGION` / `DEFAULT_REGION` | `us-east-1` | Region for documents that name none |
//! | `S3_ENDPOINT_URL` | *(unset)* | Custom S3 endpoint |
//! | `S3_FORCE_PATH_STYLE` | `false` | Path-style addressing |
//! | `BROKER_MAX_ATTEMPTS` | `5` | Attempts per provider call |
//! | `BROKER_OUTPUT_FILE` | *(unset)* | Write the output record as JSON |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `LOG_FORMAT` | `text` | `json` for JSON log lines |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use s3broker_aws::{
    AwsBucketProvider, Client, ClientOptions, S3BaselineSource, S3Location, SessionCredentials,
    build_client,
};
use s3broker_core::{
    BaselineSource, Broker, BrokerConfig, EnvProperties, FileBaseline, OutputRecord,
    StaticBaseline,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
/// Logs go to stderr; stdout carries only the published variables.
fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}

fn client_options(config: &BrokerConfig, credentials: Option<SessionCredentials>) -> ClientOptions {
    ClientOptions {
        region: config.default_region.clone(),
        endpoint_url: config.endpoint_url.clone(),
        force_path_style: config.force_path_style,
        credentials,
    }
}

/// Pick the baseline source: built-in, an S3 object, or a local file.
fn baseline_source(
    config: &BrokerConfig,
    client: &Client,
) -> Result<Arc<dyn BaselineSource>> {
    let Some(path) = &config.baseline_file else {
        return Ok(Arc::new(StaticBaseline::default()));
    };
    match path.to_str().filter(|p| S3Location::is_s3_uri(p)) {
        Some(uri) => {
            let location: S3Location = uri
                .parse()
                .with_context(|| format!("invalid baseline location: {uri}"))?;
            Ok(Arc::new(S3BaselineSource::new(client.clone(), location)))
        }
        None => Ok(Arc::new(FileBaseline::new(path))),
    }
}

/// Render the pipeline variables as `key=value` lines.
fn render_variables(output: &OutputRecord) -> String {
    output
        .variables()
        .iter()
        .map(|(key, value)| format!("{key}={value}\n"))
        .collect()
}

async fn write_output_file(path: &Path, output: &OutputRecord) -> Result<()> {
    let json = serde_json::to_vec_pretty(output).context("failed to serialize output record")?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("failed to write output file {}", path.display()))
}

/// Cancel `token` on the first interrupt.
fn cancel_on_interrupt(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("received interrupt, stopping after the in-flight call");
            token.cancel();
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = BrokerConfig::from_env();

    init_tracing(&config.log_level, config.log_json)?;

    info!(
        config_file = %config.config_file.display(),
        default_region = %config.default_region,
        endpoint_url = ?config.endpoint_url,
        version = VERSION,
        "starting s3broker",
    );

    let client = build_client(&client_options(&config, SessionCredentials::from_env())).await;
    let provider = Arc::new(AwsBucketProvider::new(client.clone()));
    let baseline = baseline_source(&config, &client)?;

    let cancel = CancellationToken::new();
    cancel_on_interrupt(cancel.clone());

    let broker = Broker::new(provider, baseline, config.retry_policy())
        .with_default_region(&config.default_region)
        .with_cancellation(cancel);

    let run = broker
        .run(&config.config_file, &EnvProperties)
        .await
        .with_context(|| {
            format!(
                "failed to broker bucket from {}",
                config.config_file.display()
            )
        })?;

    print!("{}", render_variables(&run.output));

    if let Some(path) = &config.output_file {
        write_output_file(path, &run.output).await?;
        info!(path = %path.display(), "output record written");
    }

    Ok(())
}
