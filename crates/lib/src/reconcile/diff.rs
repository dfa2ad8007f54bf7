//! Desired-state construction and diffing.
//!
//! Shortcuts are compared by their `(schema, name)` identity only. An
//! existing shortcut with the right name is left alone even if it points at a
//! different table; deletions are never computed.

use std::collections::HashSet;

use serde::Serialize;
use tracing::warn;

use crate::catalog::{ShortcutDescriptor, ShortcutKey, TableDescriptor};
use crate::config::{SourceSpec, TargetSpec};

/// Difference between desired and existing shortcuts for one schema.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct ShortcutDiff {
  /// Desired shortcuts with no existing counterpart, in source order.
  pub to_create: Vec<ShortcutDescriptor>,

  /// Desired shortcuts that already exist.
  pub to_skip: Vec<ShortcutDescriptor>,
}

impl ShortcutDiff {
  /// Returns true if nothing needs to be created.
  pub fn is_empty(&self) -> bool {
    self.to_create.is_empty()
  }

  /// Size of the desired set this diff was computed from.
  pub fn total(&self) -> usize {
    self.to_create.len() + self.to_skip.len()
  }
}

/// Build the desired shortcut set for a source from its filtered tables.
///
/// Each table maps to a shortcut of the same name under the source's schema.
/// Tables sharing a name (e.g. in different source-side schemas) would collide
/// in the target, so only the first is kept.
pub fn desired_shortcuts(
  source: &SourceSpec,
  target: &TargetSpec,
  tables: &[TableDescriptor],
) -> Vec<ShortcutDescriptor> {
  let mut seen = HashSet::new();
  let mut desired = Vec::with_capacity(tables.len());

  for table in tables {
    if !seen.insert(table.name.as_str()) {
      warn!(
        schema = %source.schema,
        table = %table.name,
        parent_schema = ?table.parent_schema,
        "duplicate table name in source, keeping the first"
      );
      continue;
    }

    desired.push(ShortcutDescriptor {
      name: table.name.clone(),
      target_schema: source.schema.clone(),
      target_workspace_id: target.workspace_id.clone(),
      target_collection_id: target.collection_id.clone(),
      source_workspace_id: source.workspace_id.clone(),
      source_collection_id: source.collection_id.clone(),
      source_table_name: table.name.clone(),
    });
  }

  desired
}

/// Split `desired` into shortcuts to create and shortcuts to skip.
///
/// - In desired, not in existing → `to_create`
/// - In both (same schema and name) → `to_skip`
///
/// Order within each list follows `desired`.
pub fn compute_diff(desired: Vec<ShortcutDescriptor>, existing: &[ShortcutDescriptor]) -> ShortcutDiff {
  let existing_keys: HashSet<ShortcutKey<'_>> = existing.iter().map(ShortcutDescriptor::key).collect();
  let mut diff = ShortcutDiff::default();

  for shortcut in desired {
    if existing_keys.contains(&shortcut.key()) {
      diff.to_skip.push(shortcut);
    } else {
      diff.to_create.push(shortcut);
    }
  }

  diff
}
