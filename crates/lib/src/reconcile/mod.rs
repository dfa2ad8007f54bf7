//! The reconciliation engine.
//!
//! For each configured source:
//!
//! 1. List the source collection's tables and the target schema's shortcuts
//! 2. Narrow the tables with the source's inclusion filter
//! 3. Diff desired shortcuts against existing ones by `(schema, name)`
//! 4. Create the missing shortcuts one by one, paced by the rate limiter
//!
//! Results are folded into an [`AggregateReport`]. Progress is published as
//! [`ReconcileEvent`]s for callers that want to render it.

mod apply;
mod diff;
mod events;
mod filter;
mod orchestrator;
mod report;
mod types;

pub use apply::ShortcutApplier;
pub use diff::{ShortcutDiff, compute_diff, desired_shortcuts};
pub use events::{EventKind, EventSink, ReconcileEvent};
pub use filter::filter_tables;
pub use orchestrator::{Plan, Reconciler, SourcePlan};
pub use report::{AggregateReport, FailureRef, StatisticsAggregator, Totals};
pub use types::{AlreadyExistsPolicy, Failure, ReconciliationOutcome, SourcePhase};
