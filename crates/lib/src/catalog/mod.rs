//! Remote catalog access.
//!
//! [`CatalogApi`] is the seam between the reconciliation engine and the
//! platform's REST API. [`HttpCatalog`] talks to the real service and
//! [`RetryingCatalog`] layers the bounded retry policy over any catalog.
//! With the `test-utils` feature, `MemoryCatalog` is an in-process double with
//! scripted failures.

mod error;
mod http;
#[cfg(any(test, feature = "test-utils"))]
mod memory;
mod retry;
mod types;

use std::future::Future;

pub use error::{CatalogError, ErrorKind, TransientReason};
pub use http::{HttpCatalog, HttpCatalogConfig};
#[cfg(any(test, feature = "test-utils"))]
pub use memory::MemoryCatalog;
pub use retry::{RetryPolicy, RetryingCatalog, with_retry};
pub use types::{ShortcutDescriptor, ShortcutKey, TableDescriptor};

/// Operations the engine needs from the catalog.
///
/// Every call is awaited to completion before the next one is issued; the
/// engine never runs two calls against the same catalog concurrently.
pub trait CatalogApi {
  /// List the tables of a source collection.
  ///
  /// A collection with no tables yields an empty vector, not an error.
  fn list_source_tables(
    &self,
    workspace_id: &str,
    collection_id: &str,
  ) -> impl Future<Output = Result<Vec<TableDescriptor>, CatalogError>> + Send;

  /// List the shortcuts currently present under `schema` in a collection.
  ///
  /// A schema that does not exist yet yields an empty vector.
  fn list_existing_shortcuts(
    &self,
    workspace_id: &str,
    collection_id: &str,
    schema: &str,
  ) -> impl Future<Output = Result<Vec<ShortcutDescriptor>, CatalogError>> + Send;

  /// Create a single shortcut.
  ///
  /// Returns [`CatalogError::AlreadyExists`] when a shortcut with the same
  /// schema and name is already present.
  fn create_shortcut(&self, shortcut: &ShortcutDescriptor) -> impl Future<Output = Result<(), CatalogError>> + Send;
}
