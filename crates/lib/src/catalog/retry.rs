//! Bounded retry for transient catalog failures.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::{CatalogApi, CatalogError, ShortcutDescriptor, TableDescriptor};

/// Upper bound on a server-requested `Retry-After` wait.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Fixed-delay retry policy for transient failures.
///
/// Access, already-exists and unknown errors are returned immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  /// Total attempts including the first one. Zero behaves like one.
  pub max_attempts: u32,

  /// Delay between attempts.
  pub delay: Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts: 3,
      delay: Duration::from_millis(500),
    }
  }
}

impl RetryPolicy {
  pub fn new(max_attempts: u32, delay: Duration) -> Self {
    Self { max_attempts, delay }
  }

  /// A single attempt, no retries.
  pub fn disabled() -> Self {
    Self {
      max_attempts: 1,
      delay: Duration::ZERO,
    }
  }

  /// How long to wait before retrying after `err`.
  ///
  /// A `Retry-After` hint longer than the fixed delay is honored, capped at
  /// one minute.
  pub fn delay_for(&self, err: &CatalogError) -> Duration {
    match err {
      CatalogError::Transient {
        retry_after: Some(hint), ..
      } => (*hint).clamp(self.delay, MAX_RETRY_AFTER.max(self.delay)),
      _ => self.delay,
    }
  }
}

/// Run `call` until it succeeds, fails permanently, or attempts run out.
///
/// The last error is returned once the policy is exhausted.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, operation: &str, mut call: F) -> Result<T, CatalogError>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<T, CatalogError>>,
{
  let max_attempts = policy.max_attempts.max(1);
  let mut attempt = 1;

  loop {
    match call().await {
      Ok(value) => return Ok(value),
      Err(err) if err.is_retryable() && attempt < max_attempts => {
        let delay = policy.delay_for(&err);
        warn!(
          operation,
          attempt,
          max_attempts,
          delay_ms = delay.as_millis() as u64,
          error = %err,
          "transient catalog failure, retrying"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
      }
      Err(err) => return Err(err),
    }
  }
}

/// Wraps a catalog so every call goes through [`with_retry`].
#[derive(Debug)]
pub struct RetryingCatalog<C> {
  inner: C,
  policy: RetryPolicy,
}

impl<C> RetryingCatalog<C> {
  pub fn new(inner: C, policy: RetryPolicy) -> Self {
    Self { inner, policy }
  }

  pub fn inner(&self) -> &C {
    &self.inner
  }

  pub fn policy(&self) -> &RetryPolicy {
    &self.policy
  }
}

impl<C: CatalogApi + Sync> CatalogApi for RetryingCatalog<C> {
  async fn list_source_tables(&self, workspace_id: &str, collection_id: &str) -> Result<Vec<TableDescriptor>, CatalogError> {
    with_retry(&self.policy, "list_source_tables", || {
      self.inner.list_source_tables(workspace_id, collection_id)
    })
    .await
  }

  async fn list_existing_shortcuts(
    &self,
    workspace_id: &str,
    collection_id: &str,
    schema: &str,
  ) -> Result<Vec<ShortcutDescriptor>, CatalogError> {
    with_retry(&self.policy, "list_existing_shortcuts", || {
      self.inner.list_existing_shortcuts(workspace_id, collection_id, schema)
    })
    .await
  }

  async fn create_shortcut(&self, shortcut: &ShortcutDescriptor) -> Result<(), CatalogError> {
    with_retry(&self.policy, "create_shortcut", || self.inner.create_shortcut(shortcut)).await
  }
}
