//! Inclusion filtering of source tables.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::catalog::TableDescriptor;

/// Narrow `tables` to the names listed in `filter`.
///
/// An empty filter keeps every table. Otherwise a table is kept when its
/// name is an exact, case-sensitive member of `filter`. Source order is
/// preserved and filter names with no matching table are ignored.
pub fn filter_tables(tables: &[TableDescriptor], filter: &BTreeSet<String>) -> Vec<TableDescriptor> {
  if filter.is_empty() {
    return tables.to_vec();
  }

  let kept: Vec<TableDescriptor> = tables
    .iter()
    .filter(|table| filter.contains(&table.name))
    .cloned()
    .collect();

  if kept.is_empty() && !tables.is_empty() {
    warn!(
      filter = ?filter,
      available = tables.len(),
      "table filter matched none of the source tables"
    );
  } else {
    debug!(kept = kept.len(), available = tables.len(), "applied table filter");
  }

  kept
}
