//! Implementation of the `lakesync setup` and `lakesync refresh` commands.

use std::time::Instant;

use anyhow::{Result, bail};
use tracing::info;

use lakesync_lib::reconcile::AggregateReport;

use super::{GlobalArgs, Session, load_config};
use crate::output::{format_duration, format_rate, print_error, print_json, print_stat, print_success, print_warning};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
  Setup,
  Refresh,
}

/// Reconcile every configured source.
///
/// Both modes run the same algorithm; `setup` is the first run against a
/// fresh target and `refresh` any run after that.
pub fn cmd_sync(global: &GlobalArgs, mode: SyncMode, fail_on_error: bool) -> Result<()> {
  let path = global.config_path();
  let config = load_config(&path)?;
  info!(config = %path.display(), ?mode, "starting sync");

  if config.sources.is_empty() {
    print_warning("No sources configured, nothing to do");
  }

  let session = Session::open(&config, global)?;
  let start = Instant::now();
  let report = match mode {
    SyncMode::Setup => session.rt.block_on(session.reconciler.setup(&config.sources))?,
    SyncMode::Refresh => session.rt.block_on(session.reconciler.refresh(&config.sources))?,
  };
  session.finish()?;

  render_report(global, &report, start)?;
  exit_status(&report, fail_on_error)
}

pub(crate) fn render_report(global: &GlobalArgs, report: &AggregateReport, start: Instant) -> Result<()> {
  if global.format.is_json() {
    return print_json(report);
  }

  println!();
  if report.is_success() {
    print_success("Reconciliation complete");
  } else {
    print_error("Reconciliation finished with failures");
  }

  let totals = &report.totals;
  print_stat("Sources", &report.sources.len().to_string());
  print_stat("Created", &totals.created.to_string());
  print_stat("Skipped", &totals.skipped.to_string());
  print_stat("Already present", &totals.already_present.to_string());
  print_stat("Failed", &totals.failed.to_string());
  print_stat("Success rate", &format_rate(report.success_rate()));
  print_stat("Elapsed", &format_duration(start.elapsed()));

  if global.verbose {
    println!();
    for (key, outcome) in &report.sources {
      println!(
        "  {} ({}): {} created, {} skipped, {} already present, {} failed",
        key,
        outcome.schema,
        outcome.created.len(),
        outcome.skipped.len(),
        outcome.already_present.len(),
        outcome.failed.len()
      );
    }
  }

  let failures: Vec<_> = report.failures().collect();
  if !failures.is_empty() {
    println!();
    println!("Failures:");
    for failure in failures {
      match failure.table {
        Some(table) => println!("  - {}/{} [{}]: {}", failure.source, table, failure.kind, failure.message),
        None => println!("  - {} [{}]: {}", failure.source, failure.kind, failure.message),
      }
    }
  }

  Ok(())
}

pub(crate) fn exit_status(report: &AggregateReport, fail_on_error: bool) -> Result<()> {
  if fail_on_error && !report.is_success() {
    bail!("{} operation(s) failed", report.totals.failed);
  }
  Ok(())
}
