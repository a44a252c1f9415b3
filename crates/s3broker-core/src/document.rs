//! Configuration document loading.
//!
//! A document is read from disk, `${name}` placeholders are replaced from a
//! [`PropertySource`] (deployment properties or the environment), and the
//! result is parsed as JSON (`.json` files) or YAML (anything else).

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;
use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use s3broker_model::DesiredState;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ConfigurationError;

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z0-9_.\-]+)\}").expect("placeholder pattern is valid")
});

/// Looks up deployment properties by name.
pub trait PropertySource: Send + Sync {
    /// The value of `name`, if defined.
    fn property(&self, name: &str) -> Option<String>;
}

/// Properties read from process environment variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvProperties;

impl PropertySource for EnvProperties {
    fn property(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl PropertySource for BTreeMap<String, String> {
    fn property(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl<S: BuildHasher + Send + Sync> PropertySource for HashMap<String, String, S> {
    fn property(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Serialization format of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// JSON.
    Json,
    /// YAML (a superset of JSON).
    Yaml,
}

impl DocumentFormat {
    /// Pick the format from the file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => DocumentFormat::Json,
            _ => DocumentFormat::Yaml,
        }
    }
}

/// Replace every `${name}` placeholder in `text`.
///
/// # Errors
///
/// Returns [`ConfigurationError::UnresolvedProperty`] for the first
/// placeholder the source cannot resolve.
pub fn substitute_properties(
    text: &str,
    location: &str,
    properties: &dyn PropertySource,
) -> Result<String, ConfigurationError> {
    let mut missing = None;
    let substituted = PLACEHOLDER_RE.replace_all(text, |caps: &Captures<'_>| {
        let name = &caps[1];
        properties.property(name).unwrap_or_else(|| {
            missing.get_or_insert_with(|| name.to_owned());
            String::new()
        })
    });
    match missing {
        Some(name) => Err(ConfigurationError::UnresolvedProperty {
            name,
            location: location.to_owned(),
        }),
        None => Ok(substituted.into_owned()),
    }
}

/// Parse a document of any deserializable type.
///
/// # Errors
///
/// Returns [`ConfigurationError::Parse`] when the text is not a valid
/// document of type `T`.
pub fn parse_document<T: DeserializeOwned>(
    text: &str,
    format: DocumentFormat,
    location: &str,
) -> Result<T, ConfigurationError> {
    let parse_error = |message: String| ConfigurationError::Parse {
        location: location.to_owned(),
        message,
    };
    match format {
        DocumentFormat::Json => serde_json::from_str(text).map_err(|e| parse_error(e.to_string())),
        DocumentFormat::Yaml => serde_yaml::from_str(text).map_err(|e| parse_error(e.to_string())),
    }
}

/// Read a document from disk, substitute properties and parse it.
///
/// # Errors
///
/// Returns [`ConfigurationError`] when the file cannot be read, a
/// placeholder is unresolved, or the document does not parse.
pub async fn load_document<T: DeserializeOwned>(
    path: &Path,
    properties: &dyn PropertySource,
) -> Result<T, ConfigurationError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigurationError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    let location = path.display().to_string();
    let text = substitute_properties(&text, &location, properties)?;
    debug!(path = %location, "configuration document loaded");
    parse_document(&text, DocumentFormat::from_path(path), &location)
}

/// Load the bucket configuration document.
///
/// # Errors
///
/// See [`load_document`].
pub async fn load_desired_state(
    path: &Path,
    properties: &dyn PropertySource,
) -> Result<DesiredState, ConfigurationError> {
    load_document(path, properties).await
}
