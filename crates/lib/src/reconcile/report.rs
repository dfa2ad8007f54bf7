//! Aggregated statistics across sources.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::catalog::ErrorKind;

use super::types::ReconciliationOutcome;

/// Summed counts across every source in a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
  pub created: usize,
  pub skipped: usize,
  pub already_present: usize,
  pub failed: usize,
}

impl Totals {
  fn add(&mut self, outcome: &ReconciliationOutcome) {
    self.created += outcome.created.len();
    self.skipped += outcome.skipped.len();
    self.already_present += outcome.already_present.len();
    self.failed += outcome.failed.len();
  }
}

/// A failure with the source it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureRef<'a> {
  pub source: &'a str,
  /// `None` for a source-level failure.
  pub table: Option<&'a str>,
  pub kind: ErrorKind,
  pub message: &'a str,
}

/// Final report of a run, keyed by source.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateReport {
  pub sources: BTreeMap<String, ReconciliationOutcome>,
  pub totals: Totals,
}

impl AggregateReport {
  /// `created / (created + skipped + already_present + failed)`.
  ///
  /// `None` when the run had nothing to account for.
  pub fn success_rate(&self) -> Option<f64> {
    let t = &self.totals;
    let denominator = t.created + t.skipped + t.already_present + t.failed;
    if denominator == 0 {
      return None;
    }
    Some(t.created as f64 / denominator as f64)
  }

  /// Every failure in source order.
  pub fn failures(&self) -> impl Iterator<Item = FailureRef<'_>> {
    self.sources.iter().flat_map(|(source, outcome)| {
      outcome.failed.iter().map(move |failure| FailureRef {
        source,
        table: failure.table(),
        kind: failure.kind,
        message: &failure.message,
      })
    })
  }

  pub fn is_success(&self) -> bool {
    self.totals.failed == 0
  }

  pub fn outcome(&self, source: &str) -> Option<&ReconciliationOutcome> {
    self.sources.get(source)
  }
}

/// Folds per-source outcomes into an [`AggregateReport`].
#[derive(Debug, Default)]
pub struct StatisticsAggregator {
  report: AggregateReport,
}

impl StatisticsAggregator {
  pub fn new() -> Self {
    Self::default()
  }

  /// Record a finished source. A source recorded twice replaces its earlier
  /// outcome in the totals as well.
  pub fn record(&mut self, source: impl Into<String>, outcome: ReconciliationOutcome) {
    self.report.sources.insert(source.into(), outcome);
    let mut totals = Totals::default();
    for outcome in self.report.sources.values() {
      totals.add(outcome);
    }
    self.report.totals = totals;
  }

  pub fn finish(self) -> AggregateReport {
    self.report
  }
}
