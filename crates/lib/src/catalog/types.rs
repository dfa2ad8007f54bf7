//! Descriptors exchanged with the catalog.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A table as reported by a source collection listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
  pub name: String,

  /// Schema inside the source collection, for schema-enabled collections.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub parent_schema: Option<String>,

  pub collection_id: String,
}

impl TableDescriptor {
  pub fn new(name: impl Into<String>, collection_id: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      parent_schema: None,
      collection_id: collection_id.into(),
    }
  }
}

/// A shortcut in a target collection, either desired or observed.
///
/// Identity is `(target_schema, name)`; see [`ShortcutDescriptor::key`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShortcutDescriptor {
  pub name: String,
  pub target_schema: String,
  pub target_workspace_id: String,
  pub target_collection_id: String,
  pub source_workspace_id: String,
  pub source_collection_id: String,
  pub source_table_name: String,
}

impl ShortcutDescriptor {
  /// The namespace identity of this shortcut.
  ///
  /// Shortcut names are unique within a schema, so two descriptors with the
  /// same key refer to the same shortcut even if their targets differ.
  pub fn key(&self) -> ShortcutKey<'_> {
    ShortcutKey {
      schema: &self.target_schema,
      name: &self.name,
    }
  }
}

/// Borrowed `(schema, name)` identity of a shortcut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShortcutKey<'a> {
  pub schema: &'a str,
  pub name: &'a str,
}

impl fmt::Display for ShortcutKey<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.schema, self.name)
  }
}
