//! Catalog error taxonomy.
//!
//! Remote failures are classified once, at the HTTP boundary, into the four
//! kinds the engine reasons about. Everything downstream matches on
//! [`ErrorKind`] rather than on status codes.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error code the catalog returns when a listed schema does not exist.
pub(crate) const SCHEMA_NOT_FOUND: &str = "SchemaNotFound";

/// Longest error body kept in a message.
const MAX_MESSAGE_LEN: usize = 512;

/// Coarse classification of a remote failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  /// Permission denied or identifiers that do not resolve. Never retried.
  Access,
  /// Rate limiting or a momentary network/service failure. Retried.
  Transient,
  /// The shortcut is already there. Not a failure.
  AlreadyExists,
  /// Anything unclassified. Recorded, not retried.
  Unknown,
}

impl fmt::Display for ErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      ErrorKind::Access => "access",
      ErrorKind::Transient => "transient",
      ErrorKind::AlreadyExists => "already_exists",
      ErrorKind::Unknown => "unknown",
    };
    f.write_str(s)
  }
}

/// Why a transient failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransientReason {
  /// HTTP 429.
  RateLimited,
  /// The service answered with a 5xx or request timeout.
  Unavailable,
  /// The request never got an answer.
  Network,
}

impl fmt::Display for TransientReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      TransientReason::RateLimited => "rate limited",
      TransientReason::Unavailable => "service unavailable",
      TransientReason::Network => "network",
    };
    f.write_str(s)
  }
}

/// Errors returned by catalog operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
  #[error("access denied (HTTP {status}): {message}")]
  Access {
    status: u16,
    code: Option<String>,
    message: String,
  },

  #[error("transient failure ({reason}): {message}")]
  Transient {
    reason: TransientReason,
    message: String,
    /// Server-requested wait, from `Retry-After`.
    retry_after: Option<Duration>,
  },

  #[error("already exists: {message}")]
  AlreadyExists { message: String },

  #[error("unexpected catalog response{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
  Unknown { status: Option<u16>, message: String },
}

impl CatalogError {
  /// Classify a non-success HTTP response.
  ///
  /// `body` is the raw response body; when it is a JSON error document its
  /// `errorCode` and `message` fields are used.
  pub fn from_response(status: u16, body: &str, retry_after: Option<Duration>) -> Self {
    let (code, message) = parse_error_body(body);
    let message = message.unwrap_or_else(|| format!("HTTP {status}"));

    match status {
      409 => CatalogError::AlreadyExists { message },
      400 | 401 | 403 | 404 => CatalogError::Access { status, code, message },
      429 => CatalogError::Transient {
        reason: TransientReason::RateLimited,
        message,
        retry_after,
      },
      408 | 500 | 502 | 503 | 504 => CatalogError::Transient {
        reason: TransientReason::Unavailable,
        message,
        retry_after,
      },
      _ => CatalogError::Unknown {
        status: Some(status),
        message,
      },
    }
  }

  /// A request that failed before any response arrived.
  pub fn network(message: impl Into<String>) -> Self {
    CatalogError::Transient {
      reason: TransientReason::Network,
      message: message.into(),
      retry_after: None,
    }
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      CatalogError::Access { .. } => ErrorKind::Access,
      CatalogError::Transient { .. } => ErrorKind::Transient,
      CatalogError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
      CatalogError::Unknown { .. } => ErrorKind::Unknown,
    }
  }

  /// Only transient failures are worth another attempt.
  pub fn is_retryable(&self) -> bool {
    matches!(self, CatalogError::Transient { .. })
  }

  pub(crate) fn is_schema_not_found(&self) -> bool {
    matches!(
      self,
      CatalogError::Access { status: 404, code: Some(code), .. } if code == SCHEMA_NOT_FOUND
    )
  }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
  #[serde(default)]
  error_code: Option<String>,
  #[serde(default)]
  message: Option<String>,
}

fn parse_error_body(body: &str) -> (Option<String>, Option<String>) {
  let body = body.trim();
  if body.is_empty() {
    return (None, None);
  }

  match serde_json::from_str::<ErrorBody>(body) {
    Ok(parsed) => (parsed.error_code, parsed.message),
    Err(_) => (None, Some(truncate(body))),
  }
}

fn truncate(s: &str) -> String {
  if s.len() <= MAX_MESSAGE_LEN {
    return s.to_string();
  }
  let mut end = MAX_MESSAGE_LEN;
  while !s.is_char_boundary(end) {
    end -= 1;
  }
  format!("{}...", &s[..end])
}
