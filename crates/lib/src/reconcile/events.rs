//! Structured progress events.
//!
//! The engine reports progress as a stream of [`ReconcileEvent`]s over an
//! unbounded channel. Rendering is left to whoever holds the receiver.

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use crate::catalog::ErrorKind;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventKind {
  SourceStarted,
  Created,
  AlreadyPresent,
  Skipped,
  Failed { kind: ErrorKind, message: String },
  SourceFailed { kind: ErrorKind, message: String },
  SourceFinished,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconcileEvent {
  pub source: String,
  /// Shortcut name, absent for source-level events.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub table: Option<String>,
  #[serde(flatten)]
  pub kind: EventKind,
}

/// Optional event sender.
///
/// Sending never fails the run; a dropped receiver just silences events.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
  tx: Option<UnboundedSender<ReconcileEvent>>,
}

impl EventSink {
  pub fn new(tx: UnboundedSender<ReconcileEvent>) -> Self {
    Self { tx: Some(tx) }
  }

  pub fn emit(&self, source: &str, table: Option<&str>, kind: EventKind) {
    if let Some(tx) = &self.tx {
      let _ = tx.send(ReconcileEvent {
        source: source.to_string(),
        table: table.map(str::to_string),
        kind,
      });
    }
  }
}
