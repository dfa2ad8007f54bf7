//! In-process catalog with scripted failures.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{CatalogApi, CatalogError, ShortcutDescriptor, TableDescriptor};

/// A catalog held entirely in memory.
///
/// Collections are keyed by `(workspace_id, collection_id)`. Failures can be
/// scripted per collection (for listings) or per `(schema, name)` (for
/// creates), either for a fixed number of calls or permanently.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
  state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
  tables: HashMap<(String, String), Vec<TableDescriptor>>,
  shortcuts: Vec<ShortcutDescriptor>,
  listing_failures: HashMap<String, VecDeque<CatalogError>>,
  denied: HashMap<String, CatalogError>,
  create_failures: HashMap<(String, String), VecDeque<CatalogError>>,
  listing_calls: HashMap<String, u32>,
  create_calls: Vec<ShortcutDescriptor>,
}

impl State {
  fn next_listing_failure(&mut self, collection_id: &str) -> Option<CatalogError> {
    *self.listing_calls.entry(collection_id.to_string()).or_insert(0) += 1;

    if let Some(err) = self
      .listing_failures
      .get_mut(collection_id)
      .and_then(|queue| queue.pop_front())
    {
      return Some(err);
    }
    self.denied.get(collection_id).cloned()
  }
}

impl MemoryCatalog {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, State> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Register an empty collection.
  pub fn add_collection(&self, workspace_id: &str, collection_id: &str) {
    self
      .lock()
      .tables
      .entry((workspace_id.to_string(), collection_id.to_string()))
      .or_default();
  }

  /// Append a table to a collection, registering the collection if needed.
  pub fn add_table(&self, workspace_id: &str, collection_id: &str, name: &str) {
    self
      .lock()
      .tables
      .entry((workspace_id.to_string(), collection_id.to_string()))
      .or_default()
      .push(TableDescriptor::new(name, collection_id));
  }

  pub fn add_tables(&self, workspace_id: &str, collection_id: &str, names: &[&str]) {
    for name in names {
      self.add_table(workspace_id, collection_id, name);
    }
  }

  /// Seed a pre-existing shortcut.
  pub fn add_shortcut(&self, shortcut: ShortcutDescriptor) {
    self.lock().shortcuts.push(shortcut);
  }

  /// Fail the next `times` listings against `collection_id` with `err`.
  pub fn fail_listing(&self, collection_id: &str, err: CatalogError, times: usize) {
    let mut state = self.lock();
    let queue = state.listing_failures.entry(collection_id.to_string()).or_default();
    queue.extend(std::iter::repeat_n(err, times));
  }

  /// Fail every listing against `collection_id` with `err`.
  pub fn deny_collection(&self, collection_id: &str, err: CatalogError) {
    self.lock().denied.insert(collection_id.to_string(), err);
  }

  /// Fail the next `times` creates of `schema/name` with `err`.
  pub fn fail_create(&self, schema: &str, name: &str, err: CatalogError, times: usize) {
    let mut state = self.lock();
    let queue = state
      .create_failures
      .entry((schema.to_string(), name.to_string()))
      .or_default();
    queue.extend(std::iter::repeat_n(err, times));
  }

  /// All shortcuts currently held, seeded and created.
  pub fn shortcuts(&self) -> Vec<ShortcutDescriptor> {
    self.lock().shortcuts.clone()
  }

  /// Every create attempt, in call order, including failed ones.
  pub fn create_calls(&self) -> Vec<ShortcutDescriptor> {
    self.lock().create_calls.clone()
  }

  /// Number of listing calls (tables or shortcuts) made against a collection.
  pub fn listing_calls(&self, collection_id: &str) -> u32 {
    self.lock().listing_calls.get(collection_id).copied().unwrap_or(0)
  }
}

impl CatalogApi for MemoryCatalog {
  async fn list_source_tables(&self, workspace_id: &str, collection_id: &str) -> Result<Vec<TableDescriptor>, CatalogError> {
    let mut state = self.lock();
    if let Some(err) = state.next_listing_failure(collection_id) {
      return Err(err);
    }

    state
      .tables
      .get(&(workspace_id.to_string(), collection_id.to_string()))
      .cloned()
      .ok_or_else(|| CatalogError::Access {
        status: 404,
        code: Some("ItemNotFound".to_string()),
        message: format!("collection {collection_id} not found in workspace {workspace_id}"),
      })
  }

  async fn list_existing_shortcuts(
    &self,
    workspace_id: &str,
    collection_id: &str,
    schema: &str,
  ) -> Result<Vec<ShortcutDescriptor>, CatalogError> {
    let mut state = self.lock();
    if let Some(err) = state.next_listing_failure(collection_id) {
      return Err(err);
    }

    Ok(
      state
        .shortcuts
        .iter()
        .filter(|s| {
          s.target_workspace_id == workspace_id && s.target_collection_id == collection_id && s.target_schema == schema
        })
        .cloned()
        .collect(),
    )
  }

  async fn create_shortcut(&self, shortcut: &ShortcutDescriptor) -> Result<(), CatalogError> {
    let mut state = self.lock();
    state.create_calls.push(shortcut.clone());

    let key = (shortcut.target_schema.clone(), shortcut.name.clone());
    if let Some(err) = state.create_failures.get_mut(&key).and_then(|queue| queue.pop_front()) {
      return Err(err);
    }

    let exists = state.shortcuts.iter().any(|s| {
      s.target_collection_id == shortcut.target_collection_id && s.key() == shortcut.key()
    });
    if exists {
      return Err(CatalogError::AlreadyExists {
        message: format!("shortcut {} already exists", shortcut.key()),
      });
    }

    state.shortcuts.push(shortcut.clone());
    Ok(())
  }
}
