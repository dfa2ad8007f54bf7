//! Issuing create calls for a diff.

use tracing::{debug, info, warn};

use crate::catalog::{CatalogApi, CatalogError, ShortcutDescriptor};
use crate::ratelimit::RateLimiter;

use super::events::{EventKind, EventSink};
use super::types::{AlreadyExistsPolicy, ReconciliationOutcome};

/// Creates shortcuts one at a time and classifies each result.
///
/// Every call is preceded by [`RateLimiter::acquire`]. A failed create is
/// recorded and the next one is attempted; nothing here aborts.
#[derive(Debug)]
pub struct ShortcutApplier<'a, C> {
  catalog: &'a C,
  limiter: &'a RateLimiter,
  already_exists: AlreadyExistsPolicy,
  events: &'a EventSink,
}

impl<'a, C: CatalogApi + Sync> ShortcutApplier<'a, C> {
  pub fn new(
    catalog: &'a C,
    limiter: &'a RateLimiter,
    already_exists: AlreadyExistsPolicy,
    events: &'a EventSink,
  ) -> Self {
    Self {
      catalog,
      limiter,
      already_exists,
      events,
    }
  }

  /// Create each shortcut in `to_create`, in order, recording into `outcome`.
  pub async fn apply(&self, source: &str, to_create: Vec<ShortcutDescriptor>, outcome: &mut ReconciliationOutcome) {
    for shortcut in to_create {
      self.limiter.acquire().await;

      match self.catalog.create_shortcut(&shortcut).await {
        Ok(()) => {
          info!(source, table = %shortcut.name, schema = %shortcut.target_schema, "created shortcut");
          self.events.emit(source, Some(&shortcut.name), EventKind::Created);
          outcome.created.push(shortcut);
        }
        Err(CatalogError::AlreadyExists { .. }) => {
          debug!(
            source,
            table = %shortcut.name,
            policy = %self.already_exists,
            "shortcut appeared since listing"
          );
          self.record_already_exists(source, shortcut, outcome);
        }
        Err(err) => {
          warn!(source, table = %shortcut.name, kind = %err.kind(), error = %err, "failed to create shortcut");
          self.events.emit(
            source,
            Some(&shortcut.name),
            EventKind::Failed {
              kind: err.kind(),
              message: err.to_string(),
            },
          );
          outcome.record_failure(shortcut, &err);
        }
      }
    }
  }

  fn record_already_exists(&self, source: &str, shortcut: ShortcutDescriptor, outcome: &mut ReconciliationOutcome) {
    match self.already_exists {
      AlreadyExistsPolicy::AlreadyPresent => {
        self.events.emit(source, Some(&shortcut.name), EventKind::AlreadyPresent);
        outcome.already_present.push(shortcut);
      }
      AlreadyExistsPolicy::Created => {
        self.events.emit(source, Some(&shortcut.name), EventKind::Created);
        outcome.created.push(shortcut);
      }
      AlreadyExistsPolicy::Skipped => {
        self.events.emit(source, Some(&shortcut.name), EventKind::Skipped);
        outcome.skipped.push(shortcut);
      }
    }
  }
}
