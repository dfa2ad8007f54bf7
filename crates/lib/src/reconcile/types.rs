//! Outcome types for a reconciliation run.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogError, ErrorKind, ShortcutDescriptor};

/// Where a create that reports "already exists" is counted.
///
/// A conflict on create means someone else made the shortcut between our
/// listing and our call. The default keeps such shortcuts apart from the
/// ones this run created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlreadyExistsPolicy {
  /// Count in the `already_present` bucket.
  #[default]
  AlreadyPresent,
  /// Count as created.
  Created,
  /// Count as skipped, as if the listing had reported it.
  Skipped,
}

impl fmt::Display for AlreadyExistsPolicy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      AlreadyExistsPolicy::AlreadyPresent => "already-present",
      AlreadyExistsPolicy::Created => "created",
      AlreadyExistsPolicy::Skipped => "skipped",
    };
    f.write_str(s)
  }
}

/// Per-source state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourcePhase {
  Fetching,
  Filtering,
  Diffing,
  Applying,
  Done,
}

impl fmt::Display for SourcePhase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      SourcePhase::Fetching => "fetching",
      SourcePhase::Filtering => "filtering",
      SourcePhase::Diffing => "diffing",
      SourcePhase::Applying => "applying",
      SourcePhase::Done => "done",
    };
    f.write_str(s)
  }
}

/// A single recorded failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
  /// The shortcut whose create failed, or `None` when the whole source
  /// failed before anything could be applied.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub shortcut: Option<ShortcutDescriptor>,
  pub kind: ErrorKind,
  pub message: String,
}

impl Failure {
  pub fn table(&self) -> Option<&str> {
    self.shortcut.as_ref().map(|s| s.name.as_str())
  }
}

/// Result of reconciling one source.
///
/// Every desired shortcut ends up in exactly one of the four buckets.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconciliationOutcome {
  /// Target schema the source maps to.
  pub schema: String,
  pub created: Vec<ShortcutDescriptor>,
  pub skipped: Vec<ShortcutDescriptor>,
  pub already_present: Vec<ShortcutDescriptor>,
  pub failed: Vec<Failure>,
}

impl ReconciliationOutcome {
  pub fn new(schema: impl Into<String>) -> Self {
    Self {
      schema: schema.into(),
      ..Self::default()
    }
  }

  /// Outcome for a source that failed before its diff was known.
  pub fn source_failed(schema: impl Into<String>, err: &CatalogError, context: &str) -> Self {
    let mut outcome = Self::new(schema);
    outcome.failed.push(Failure {
      shortcut: None,
      kind: err.kind(),
      message: format!("{context}: {err}"),
    });
    outcome
  }

  pub fn record_failure(&mut self, shortcut: ShortcutDescriptor, err: &CatalogError) {
    self.failed.push(Failure {
      shortcut: Some(shortcut),
      kind: err.kind(),
      message: err.to_string(),
    });
  }

  /// True when the source failed as a whole rather than per shortcut.
  pub fn is_source_failure(&self) -> bool {
    self.failed.iter().any(|f| f.shortcut.is_none())
  }

  /// Number of shortcuts accounted for across all buckets.
  pub fn total(&self) -> usize {
    self.created.len() + self.skipped.len() + self.already_present.len() + self.failed.len()
  }

  pub fn is_success(&self) -> bool {
    self.failed.is_empty()
  }
}
