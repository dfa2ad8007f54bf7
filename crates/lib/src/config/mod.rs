//! Loading and validating the run configuration.
//!
//! Configuration is a plain value: it is read once, validated, and then
//! passed into the engine. Nothing here talks to the catalog, so every
//! configuration error surfaces before the first remote call.

mod types;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::consts::API_URL_ENV;

pub use types::{ApiSettings, Config, EngineSettings, SourceSpec, TargetSpec};

/// Slowest token bucket rate accepted, one call every ~17 minutes.
pub const MIN_REQUESTS_PER_SECOND: f64 = 0.001;

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config {}: {source}", .path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config: {0}")]
  Parse(#[from] toml::de::Error),

  #[error("invalid source '{key}': {reason}")]
  InvalidSource { key: String, reason: String },

  #[error("invalid target: {0}")]
  InvalidTarget(String),

  #[error("invalid engine settings: {0}")]
  InvalidEngine(String),

  #[error("sources '{first}' and '{second}' both map to schema '{schema}'")]
  DuplicateSchema {
    schema: String,
    first: String,
    second: String,
  },

  #[error("source '{0}' is already configured")]
  DuplicateSource(String),

  #[error("no API base URL configured (set api.base_url or {})", API_URL_ENV)]
  MissingApiUrl,
}

impl Config {
  /// Read, parse and validate a config file.
  ///
  /// `LAKESYNC_API_URL`, when set, overrides `api.base_url`.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;

    let mut config = Self::from_toml_str(&content)?;
    if let Ok(url) = std::env::var(API_URL_ENV)
      && !url.trim().is_empty()
    {
      debug!(url = %url, "api url overridden from environment");
      config.api.base_url = Some(url);
    }
    Ok(config)
  }

  /// Parse and validate TOML content.
  pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
    let config: Config = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    validate_target(&self.target)?;
    validate_engine(&self.engine)?;
    validate_sources(&self.sources)
  }

  /// Check that `spec` could be added under `key` without conflict.
  pub fn check_new_source(&self, key: &str, spec: &SourceSpec) -> Result<(), ConfigError> {
    check_new_source(&self.sources, key, spec)
  }

  /// The API base URL, required once remote calls are about to be made.
  pub fn base_url(&self) -> Result<&str, ConfigError> {
    match self.api.base_url.as_deref() {
      Some(url) if !url.trim().is_empty() => Ok(url),
      _ => Err(ConfigError::MissingApiUrl),
    }
  }
}

fn is_blank(s: &str) -> bool {
  s.trim().is_empty()
}

pub(crate) fn validate_target(target: &TargetSpec) -> Result<(), ConfigError> {
  if is_blank(&target.workspace_id) {
    return Err(ConfigError::InvalidTarget("workspace_id is empty".to_string()));
  }
  if is_blank(&target.collection_id) {
    return Err(ConfigError::InvalidTarget("collection_id is empty".to_string()));
  }
  Ok(())
}

fn validate_engine(engine: &EngineSettings) -> Result<(), ConfigError> {
  if let Some(rate) = engine.requests_per_second
    && !(rate.is_finite() && rate >= MIN_REQUESTS_PER_SECOND)
  {
    return Err(ConfigError::InvalidEngine(format!(
      "requests_per_second must be at least {MIN_REQUESTS_PER_SECOND}, got {rate}"
    )));
  }
  if engine.burst == 0 {
    return Err(ConfigError::InvalidEngine("burst must be at least 1".to_string()));
  }
  if engine.retry_attempts == 0 {
    return Err(ConfigError::InvalidEngine("retry_attempts must be at least 1".to_string()));
  }
  Ok(())
}

/// Validate a single source on its own.
pub fn validate_source(key: &str, spec: &SourceSpec) -> Result<(), ConfigError> {
  let invalid = |reason: &str| ConfigError::InvalidSource {
    key: key.to_string(),
    reason: reason.to_string(),
  };

  if is_blank(key) {
    return Err(invalid("source key is empty"));
  }
  if is_blank(&spec.workspace_id) {
    return Err(invalid("workspace_id is empty"));
  }
  if is_blank(&spec.collection_id) {
    return Err(invalid("collection_id is empty"));
  }
  if is_blank(&spec.schema) {
    return Err(invalid("schema is empty"));
  }
  if spec.tables.iter().any(|t| is_blank(t)) {
    return Err(invalid("table filter contains an empty name"));
  }
  Ok(())
}

/// Validate every source and reject schema collisions between them.
pub(crate) fn validate_sources<'a, I>(sources: I) -> Result<(), ConfigError>
where
  I: IntoIterator<Item = (&'a String, &'a SourceSpec)>,
{
  let mut schemas: HashMap<&str, &str> = HashMap::new();
  for (key, spec) in sources {
    validate_source(key, spec)?;
    if let Some(first) = schemas.insert(spec.schema.as_str(), key.as_str()) {
      return Err(ConfigError::DuplicateSchema {
        schema: spec.schema.clone(),
        first: first.to_string(),
        second: key.clone(),
      });
    }
  }
  Ok(())
}

pub(crate) fn check_new_source<'a, I>(existing: I, key: &str, spec: &SourceSpec) -> Result<(), ConfigError>
where
  I: IntoIterator<Item = (&'a String, &'a SourceSpec)>,
{
  validate_source(key, spec)?;
  for (existing_key, existing_spec) in existing {
    if existing_key == key {
      return Err(ConfigError::DuplicateSource(key.to_string()));
    }
    if existing_spec.schema == spec.schema {
      return Err(ConfigError::DuplicateSchema {
        schema: spec.schema.clone(),
        first: existing_key.clone(),
        second: key.to_string(),
      });
    }
  }
  Ok(())
}
