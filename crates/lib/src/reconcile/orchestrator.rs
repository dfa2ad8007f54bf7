//! Driving sources through fetch, filter, diff and apply.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog::{CatalogApi, CatalogError, ErrorKind};
use crate::config::{self, Config, ConfigError, SourceSpec, TargetSpec};
use crate::ratelimit::{RateLimitPolicy, RateLimiter};

use super::apply::ShortcutApplier;
use super::diff::{ShortcutDiff, compute_diff, desired_shortcuts};
use super::events::{EventKind, EventSink, ReconcileEvent};
use super::filter::filter_tables;
use super::report::{AggregateReport, StatisticsAggregator};
use super::types::{AlreadyExistsPolicy, ReconciliationOutcome, SourcePhase};

/// A source-level failure during fetching.
#[derive(Debug, Clone, PartialEq)]
struct FetchFailure {
  context: &'static str,
  error: CatalogError,
}

/// What a run would do for one source.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourcePlan {
  Ready { schema: String, diff: ShortcutDiff },
  Failed { schema: String, kind: ErrorKind, message: String },
}

/// Result of a dry run, keyed by source.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Plan {
  pub sources: BTreeMap<String, SourcePlan>,
}

impl Plan {
  /// Number of shortcuts a run would try to create.
  pub fn to_create(&self) -> usize {
    self
      .sources
      .values()
      .map(|plan| match plan {
        SourcePlan::Ready { diff, .. } => diff.to_create.len(),
        SourcePlan::Failed { .. } => 0,
      })
      .sum()
  }

  pub fn has_failures(&self) -> bool {
    self.sources.values().any(|plan| matches!(plan, SourcePlan::Failed { .. }))
  }
}

/// Reconciles configured sources against a target collection.
///
/// Sources are processed one at a time in key order, and creates within a
/// source one at a time. A failing source or shortcut is recorded in the
/// report and the run moves on; only configuration errors abort, and those
/// are raised before any remote call.
#[derive(Debug)]
pub struct Reconciler<C> {
  catalog: C,
  target: TargetSpec,
  limiter: Arc<RateLimiter>,
  already_exists: AlreadyExistsPolicy,
  events: EventSink,
}

impl<C: CatalogApi + Sync> Reconciler<C> {
  /// A reconciler with the default pacing and already-exists policy.
  pub fn new(catalog: C, target: TargetSpec) -> Self {
    Self {
      catalog,
      target,
      limiter: Arc::new(RateLimiter::new(RateLimitPolicy::default())),
      already_exists: AlreadyExistsPolicy::default(),
      events: EventSink::default(),
    }
  }

  /// A reconciler using the target and engine settings from `config`.
  pub fn from_config(catalog: C, config: &Config) -> Self {
    Self::new(catalog, config.target.clone())
      .with_rate_limiter(Arc::new(RateLimiter::new(config.engine.rate_limit_policy())))
      .with_already_exists(config.engine.already_exists)
  }

  pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
    self.limiter = limiter;
    self
  }

  pub fn with_already_exists(mut self, policy: AlreadyExistsPolicy) -> Self {
    self.already_exists = policy;
    self
  }

  pub fn with_events(mut self, tx: tokio::sync::mpsc::UnboundedSender<ReconcileEvent>) -> Self {
    self.events = EventSink::new(tx);
    self
  }

  pub fn catalog(&self) -> &C {
    &self.catalog
  }

  pub fn target(&self) -> &TargetSpec {
    &self.target
  }

  /// Reconcile every source against a fresh target.
  pub async fn setup(&self, sources: &BTreeMap<String, SourceSpec>) -> Result<AggregateReport, ConfigError> {
    info!(sources = sources.len(), "starting setup");
    self.run(sources.iter()).await
  }

  /// Reconcile every source again. Shortcuts already present are skipped.
  pub async fn refresh(&self, sources: &BTreeMap<String, SourceSpec>) -> Result<AggregateReport, ConfigError> {
    info!(sources = sources.len(), "starting refresh");
    self.run(sources.iter()).await
  }

  /// Reconcile a single new source against an existing target.
  ///
  /// `key` must not already be configured and `spec.schema` must not be used
  /// by any configured source.
  pub async fn add_source(
    &self,
    configured: &BTreeMap<String, SourceSpec>,
    key: &str,
    spec: &SourceSpec,
  ) -> Result<AggregateReport, ConfigError> {
    config::check_new_source(configured, key, spec)?;
    info!(source = key, schema = %spec.schema, "adding source");
    let key = key.to_string();
    self.run(std::iter::once((&key, spec))).await
  }

  /// Compute what a run would do without creating anything.
  pub async fn plan(&self, sources: &BTreeMap<String, SourceSpec>) -> Result<Plan, ConfigError> {
    config::validate_target(&self.target)?;
    config::validate_sources(sources)?;

    let mut plan = Plan::default();
    for (key, spec) in sources {
      let source_plan = match self.prepare(key, spec).await {
        Ok(diff) => SourcePlan::Ready {
          schema: spec.schema.clone(),
          diff,
        },
        Err(failure) => SourcePlan::Failed {
          schema: spec.schema.clone(),
          kind: failure.error.kind(),
          message: format!("{}: {}", failure.context, failure.error),
        },
      };
      plan.sources.insert(key.clone(), source_plan);
    }

    info!(to_create = plan.to_create(), "plan complete");
    Ok(plan)
  }

  async fn run<'a, I>(&self, sources: I) -> Result<AggregateReport, ConfigError>
  where
    I: IntoIterator<Item = (&'a String, &'a SourceSpec)> + Clone,
  {
    config::validate_target(&self.target)?;
    config::validate_sources(sources.clone())?;

    let mut aggregator = StatisticsAggregator::new();
    for (key, spec) in sources {
      let outcome = self.reconcile_source(key, spec).await;
      aggregator.record(key.clone(), outcome);
    }

    let report = aggregator.finish();
    info!(
      created = report.totals.created,
      skipped = report.totals.skipped,
      already_present = report.totals.already_present,
      failed = report.totals.failed,
      "reconciliation complete"
    );
    Ok(report)
  }

  /// Fetch, filter and diff one source.
  async fn prepare(&self, key: &str, spec: &SourceSpec) -> Result<ShortcutDiff, FetchFailure> {
    debug!(source = key, phase = %SourcePhase::Fetching, "listing source tables");
    let tables = self
      .catalog
      .list_source_tables(&spec.workspace_id, &spec.collection_id)
      .await
      .map_err(|error| FetchFailure {
        context: "listing source tables",
        error,
      })?;

    debug!(source = key, phase = %SourcePhase::Fetching, schema = %spec.schema, "listing existing shortcuts");
    let existing = self
      .catalog
      .list_existing_shortcuts(&self.target.workspace_id, &self.target.collection_id, &spec.schema)
      .await
      .map_err(|error| FetchFailure {
        context: "listing existing shortcuts",
        error,
      })?;

    debug!(source = key, phase = %SourcePhase::Filtering, tables = tables.len(), "filtering tables");
    let filtered = filter_tables(&tables, &spec.tables);
    let desired = desired_shortcuts(spec, &self.target, &filtered);

    debug!(source = key, phase = %SourcePhase::Diffing, desired = desired.len(), existing = existing.len(), "computing diff");
    Ok(compute_diff(desired, &existing))
  }

  async fn reconcile_source(&self, key: &str, spec: &SourceSpec) -> ReconciliationOutcome {
    info!(source = key, schema = %spec.schema, "reconciling source");
    self.events.emit(key, None, EventKind::SourceStarted);

    let diff = match self.prepare(key, spec).await {
      Ok(diff) => diff,
      Err(FetchFailure { context, error }) => {
        warn!(source = key, kind = %error.kind(), error = %error, "{context} failed, skipping source");
        let outcome = ReconciliationOutcome::source_failed(&spec.schema, &error, context);
        if let Some(failure) = outcome.failed.first() {
          self.events.emit(
            key,
            None,
            EventKind::SourceFailed {
              kind: failure.kind,
              message: failure.message.clone(),
            },
          );
        }
        debug!(source = key, phase = %SourcePhase::Done, "source finished");
        return outcome;
      }
    };

    let mut outcome = ReconciliationOutcome::new(&spec.schema);
    for shortcut in diff.to_skip {
      debug!(source = key, table = %shortcut.name, "shortcut already present, skipping");
      self.events.emit(key, Some(&shortcut.name), EventKind::Skipped);
      outcome.skipped.push(shortcut);
    }

    debug!(source = key, phase = %SourcePhase::Applying, to_create = diff.to_create.len(), "applying");
    ShortcutApplier::new(&self.catalog, &self.limiter, self.already_exists, &self.events)
      .apply(key, diff.to_create, &mut outcome)
      .await;

    info!(
      source = key,
      created = outcome.created.len(),
      skipped = outcome.skipped.len(),
      already_present = outcome.already_present.len(),
      failed = outcome.failed.len(),
      "source finished"
    );
    self.events.emit(key, None, EventKind::SourceFinished);
    outcome
  }
}
