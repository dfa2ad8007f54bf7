//! Implementation of the `lakesync add-source` command.

use std::collections::BTreeSet;
use std::time::Instant;

use anyhow::Result;

use lakesync_lib::config::SourceSpec;

use super::sync::{exit_status, render_report};
use super::{GlobalArgs, Session, load_config};
use crate::output::print_info;

/// Source definition as given on the command line.
pub struct NewSource {
  pub workspace_id: String,
  pub collection_id: String,
  pub schema: String,
  pub tables: Vec<String>,
}

impl NewSource {
  fn into_spec(self) -> SourceSpec {
    SourceSpec {
      workspace_id: self.workspace_id,
      collection_id: self.collection_id,
      schema: self.schema,
      tables: self.tables.into_iter().collect::<BTreeSet<_>>(),
    }
  }
}

/// Reconcile one source that is not (yet) in the config file.
///
/// The source is checked against the configured ones before any remote
/// call. The config file is not modified.
pub fn cmd_add_source(global: &GlobalArgs, key: &str, source: NewSource, fail_on_error: bool) -> Result<()> {
  let path = global.config_path();
  let config = load_config(&path)?;
  let spec = source.into_spec();
  config.check_new_source(key, &spec)?;

  let session = Session::open(&config, global)?;
  let start = Instant::now();
  let report = session
    .rt
    .block_on(session.reconciler.add_source(&config.sources, key, &spec))?;
  session.finish()?;

  render_report(global, &report, start)?;
  if !global.format.is_json() {
    print_info(&format!(
      "Add [sources.{}] to {} to include it in future refreshes",
      key,
      path.display()
    ));
  }
  exit_status(&report, fail_on_error)
}
