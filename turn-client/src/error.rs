//! Error types returned by the Turn client.

use thiserror::Error;

/// Convenience alias used throughout the crate
pub type Result<T, E = TurnError> = std::result::Result<T, E>;

/// Why a single HTTP attempt did not produce a usable response.
#[derive(Debug, Error)]
pub enum AttemptFailure {
  /// The request never produced a response (connect, reset, DNS, timeout).
  #[error("transport error: {0}")]
  Transport(#[source] reqwest::Error),

  /// The server answered with a status that is worth retrying.
  #[error("server returned status {0}")]
  Status(u16),
}

impl AttemptFailure {
  /// HTTP status behind this failure, if the server answered at all
  pub const fn status(&self) -> Option<u16> {
    match self {
      Self::Status(status) => Some(*status),
      Self::Transport(_) => None,
    }
  }
}

/// Errors surfaced by [`crate::TurnClient`] operations.
#[derive(Debug, Error)]
pub enum TurnError {
  /// The caller supplied an unusable argument. Never retried.
  #[error("invalid argument: {0}")]
  InvalidArgument(String),

  /// The client could not be configured with the given settings.
  #[error("invalid configuration: {0}")]
  InvalidConfiguration(String),

  /// The request could not be assembled, or its response body could not be
  /// read once a final status arrived.
  #[error("{operation}: HTTP error: {source}")]
  Http {
    operation: &'static str,
    #[source]
    source: reqwest::Error,
  },

  /// Every attempt allowed by the retry policy failed.
  #[error("{operation}: gave up after {attempts} attempts: {source}")]
  TransportExhausted {
    operation: &'static str,
    attempts: u32,
    #[source]
    source: AttemptFailure,
  },

  /// The remote side answered with a non-retryable, non-200 status.
  #[error("{operation}: request failed with status {status}: {body}")]
  RemoteRejected {
    operation: &'static str,
    status: u16,
    /// Error body excerpt, at most 500 characters plus a truncation marker
    body: String,
  },

  /// A 200 response whose body is undecodable or semantically invalid.
  #[error("{operation}: malformed response: {reason}")]
  MalformedResponse {
    operation: &'static str,
    reason: String,
    #[source]
    source: Option<serde_json::Error>,
  },

  /// The request deadline passed before the operation finished.
  #[error("{operation}: deadline exceeded")]
  Timeout {
    operation: &'static str,
    #[source]
    last: Option<AttemptFailure>,
  },

  /// The caller interrupted the operation.
  #[error("{operation}: interrupted")]
  Interrupted { operation: &'static str },
}

impl TurnError {
  /// HTTP status code associated with this error, when the server answered
  pub fn status(&self) -> Option<u16> {
    match self {
      Self::RemoteRejected { status, .. } => Some(*status),
      Self::TransportExhausted { source, .. } => source.status(),
      Self::Timeout { last, .. } => last.as_ref().and_then(AttemptFailure::status),
      _ => None,
    }
  }

  /// Whether the operation ended because of the request deadline or an
  /// interruption rather than a verdict from the server
  pub const fn is_cancellation(&self) -> bool {
    matches!(self, Self::Timeout { .. } | Self::Interrupted { .. })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_remote_rejected_message_names_status() {
    let err = TurnError::RemoteRejected {
      operation: "check",
      status: 404,
      body: "not found".to_string(),
    };
    assert_eq!(err.to_string(), "check: request failed with status 404: not found");
    assert_eq!(err.status(), Some(404));
  }

  #[test]
  fn test_transport_exhausted_exposes_last_status() {
    let err = TurnError::TransportExhausted {
      operation: "check",
      attempts: 4,
      source: AttemptFailure::Status(503),
    };
    assert!(err.to_string().contains("status 503"));
    assert_eq!(err.status(), Some(503));
    assert!(!err.is_cancellation());
  }

  #[test]
  fn test_cancellation_variants() {
    assert!(TurnError::Interrupted { operation: "check" }.is_cancellation());
    assert!(
      TurnError::Timeout {
        operation: "check",
        last: None
      }
      .is_cancellation()
    );
    assert!(!TurnError::InvalidArgument("x".to_string()).is_cancellation());
  }
}
