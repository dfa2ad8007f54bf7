//! Configuration record types.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::catalog::RetryPolicy;
use crate::ratelimit::RateLimitPolicy;
use crate::reconcile::AlreadyExistsPolicy;

/// A full run configuration, as read from `lakesync.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
  #[serde(default)]
  pub api: ApiSettings,

  pub target: TargetSpec,

  /// Sources by operator-chosen key. Processed in key order.
  #[serde(default)]
  pub sources: BTreeMap<String, SourceSpec>,

  #[serde(default)]
  pub engine: EngineSettings,
}

/// Remote API connection settings. The token is never part of the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiSettings {
  pub base_url: Option<String>,
  pub timeout_secs: u64,
}

impl Default for ApiSettings {
  fn default() -> Self {
    Self {
      base_url: None,
      timeout_secs: 30,
    }
  }
}

impl ApiSettings {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }
}

/// The collection shortcuts are created in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetSpec {
  pub workspace_id: String,
  pub collection_id: String,
}

/// One source collection and the schema its shortcuts land in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceSpec {
  pub workspace_id: String,
  pub collection_id: String,
  pub schema: String,

  /// Table names to include. Empty means every table.
  #[serde(default)]
  pub tables: BTreeSet<String>,
}

/// Pacing, retry and classification knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineSettings {
  /// Minimum gap between create calls. Zero disables pacing.
  pub inter_call_delay_ms: u64,

  /// When set, a token bucket replaces the fixed delay.
  pub requests_per_second: Option<f64>,

  /// Token bucket capacity.
  pub burst: u32,

  /// Attempts per remote call, first one included.
  pub retry_attempts: u32,

  pub retry_delay_ms: u64,

  pub already_exists: AlreadyExistsPolicy,
}

impl Default for EngineSettings {
  fn default() -> Self {
    Self {
      inter_call_delay_ms: 500,
      requests_per_second: None,
      burst: 1,
      retry_attempts: 3,
      retry_delay_ms: 500,
      already_exists: AlreadyExistsPolicy::default(),
    }
  }
}

impl EngineSettings {
  pub fn rate_limit_policy(&self) -> RateLimitPolicy {
    match self.requests_per_second {
      Some(per_second) => RateLimitPolicy::TokenBucket {
        per_second,
        burst: self.burst,
      },
      None if self.inter_call_delay_ms == 0 => RateLimitPolicy::Disabled,
      None => RateLimitPolicy::FixedDelay(Duration::from_millis(self.inter_call_delay_ms)),
    }
  }

  pub fn retry_policy(&self) -> RetryPolicy {
    RetryPolicy::new(self.retry_attempts, Duration::from_millis(self.retry_delay_ms))
  }
}
