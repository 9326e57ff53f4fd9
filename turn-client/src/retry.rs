//! # Retrying Transport
//!
//! Runs one logical HTTP request to completion, retrying transport errors,
//! 5xx and 429 responses with capped exponential backoff plus random jitter.
//! The [`RequestContext`] bounds the entire sequence.

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use tracing::{debug, warn};

use crate::consts::MAX_RESPONSE_SIZE;
use crate::context::{Cancellation, RequestContext};
use crate::error::{AttemptFailure, Result, TurnError};
use crate::response::read_capped;

/// Attempt budget and delay bounds for the retrying transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  /// Total attempts, the initial one included. Zero is treated as one.
  pub max_attempts: u32,
  /// Delay before the first retry
  pub initial_delay: Duration,
  /// Cap on the backoff part of any single delay
  pub max_delay: Duration,
  /// Upper bound of the uniform random jitter added to each delay
  pub max_jitter: Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts: 4,
      initial_delay: Duration::from_millis(100),
      max_delay: Duration::from_secs(5),
      max_jitter: Duration::from_millis(300),
    }
  }
}

impl RetryPolicy {
  /// Same attempt budget as the default policy but without any waiting
  pub const fn immediate() -> Self {
    Self {
      max_attempts: 4,
      initial_delay: Duration::ZERO,
      max_delay: Duration::ZERO,
      max_jitter: Duration::ZERO,
    }
  }

  /// A policy that never retries
  pub const fn no_retries() -> Self {
    Self {
      max_attempts: 1,
      ..Self::immediate()
    }
  }

  /// Backoff component of the delay before retry number `retry` (1-based),
  /// without jitter: `initial_delay * 2^(retry - 1)`, capped at `max_delay`.
  pub fn backoff(&self, retry: u32) -> Duration {
    let exponent = retry.saturating_sub(1).min(31);
    self
      .initial_delay
      .checked_mul(1u32 << exponent)
      .map_or(self.max_delay, |delay| delay.min(self.max_delay))
  }

  /// Full delay before retry number `retry`: backoff plus random jitter
  pub fn delay_for(&self, retry: u32) -> Duration {
    let jitter_ms = u64::try_from(self.max_jitter.as_millis()).unwrap_or(u64::MAX);
    let jitter = match jitter_ms {
      0 => Duration::ZERO,
      max => Duration::from_millis(rand::random_range(0..=max)),
    };
    self.backoff(retry) + jitter
  }

  const fn attempts(&self) -> u32 {
    if self.max_attempts == 0 { 1 } else { self.max_attempts }
  }
}

/// Statuses worth another attempt: any 5xx, plus 429 Too Many Requests
pub fn is_retryable_status(status: StatusCode) -> bool {
  status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// Send the request produced by `build` until it yields a non-retryable
/// response, the policy runs out of attempts, or `ctx` fires.
///
/// `build` is called once per attempt. Retryable responses are drained
/// (up to [`MAX_RESPONSE_SIZE`]) and dropped before the next attempt.
pub(crate) async fn send_with_retry<F>(
  operation: &'static str,
  policy: &RetryPolicy,
  ctx: &RequestContext,
  build: F,
) -> Result<Response>
where
  F: Fn() -> RequestBuilder,
{
  let max_attempts = policy.attempts();
  let mut last: Option<AttemptFailure> = None;
  let mut attempt = 1;

  loop {
    if let Some(cancellation) = ctx.cancellation() {
      return Err(cancelled(operation, cancellation, last));
    }

    let (http, request) = build().build_split();
    let request = request.map_err(|source| TurnError::Http { operation, source })?;

    let outcome = tokio::select! {
      biased;
      cancellation = ctx.done() => return Err(cancelled(operation, cancellation, last)),
      outcome = http.execute(request) => outcome,
    };

    let failure = match outcome {
      Ok(response) if is_retryable_status(response.status()) => {
        let status = response.status();
        tokio::select! {
          biased;
          cancellation = ctx.done() => {
            return Err(cancelled(operation, cancellation, Some(AttemptFailure::Status(status.as_u16()))));
          }
          drained = read_capped(response, MAX_RESPONSE_SIZE) => {
            if let Err(e) = drained {
              debug!("failed to drain response body: {e}");
            }
          }
        }
        AttemptFailure::Status(status.as_u16())
      }
      Ok(response) => return Ok(response),
      Err(e) => AttemptFailure::Transport(e),
    };

    if attempt >= max_attempts {
      return Err(TurnError::TransportExhausted {
        operation,
        attempts: attempt,
        source: failure,
      });
    }

    attempt += 1;
    warn!("retrying request (attempt {attempt}/{max_attempts}): {failure}");

    let delay = policy.delay_for(attempt - 1);
    last = Some(failure);
    tokio::select! {
      biased;
      cancellation = ctx.done() => return Err(cancelled(operation, cancellation, last)),
      () = tokio::time::sleep(delay) => {}
    }
  }
}

pub(crate) fn cancelled(operation: &'static str, cancellation: Cancellation, last: Option<AttemptFailure>) -> TurnError {
  match cancellation {
    Cancellation::Interrupted => TurnError::Interrupted { operation },
    Cancellation::DeadlineExceeded => TurnError::Timeout { operation, last },
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_policy_matches_documented_budget() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.max_attempts, 4);
    assert_eq!(policy.initial_delay, Duration::from_millis(100));
    assert_eq!(policy.max_delay, Duration::from_secs(5));
    assert_eq!(policy.max_jitter, Duration::from_millis(300));
  }

  #[test]
  fn test_backoff_doubles_then_caps() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.backoff(1), Duration::from_millis(100));
    assert_eq!(policy.backoff(2), Duration::from_millis(200));
    assert_eq!(policy.backoff(3), Duration::from_millis(400));
    assert_eq!(policy.backoff(7), Duration::from_millis(5000));
    assert_eq!(policy.backoff(40), Duration::from_millis(5000));
  }

  #[test]
  fn test_backoff_is_monotonic() {
    let policy = RetryPolicy::default();
    let delays: Vec<_> = (1..=12).map(|retry| policy.backoff(retry)).collect();
    assert!(delays.windows(2).all(|pair| pair[0] <= pair[1]));
    assert!(delays.iter().all(|delay| *delay <= policy.max_delay));
  }

  #[test]
  fn test_jitter_stays_within_bound() {
    let policy = RetryPolicy::default();
    for retry in 1..=5 {
      let delay = policy.delay_for(retry);
      assert!(delay >= policy.backoff(retry));
      assert!(delay <= policy.backoff(retry) + policy.max_jitter);
    }
  }

  #[test]
  fn test_immediate_policy_never_waits() {
    let policy = RetryPolicy::immediate();
    assert_eq!(policy.delay_for(1), Duration::ZERO);
    assert_eq!(policy.delay_for(3), Duration::ZERO);
  }

  #[test]
  fn test_zero_attempts_means_one() {
    let policy = RetryPolicy {
      max_attempts: 0,
      ..RetryPolicy::immediate()
    };
    assert_eq!(policy.attempts(), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_send_with_retry_waits_backoff_between_attempts() {
    // Bind then drop a listener so the port refuses connections
    let port = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
    let url = format!("http://127.0.0.1:{port}/v1/validate");
    let http = reqwest::Client::new();
    let policy = RetryPolicy {
      max_jitter: Duration::ZERO,
      ..RetryPolicy::default()
    };

    let start = tokio::time::Instant::now();
    let err = send_with_retry("check", &policy, &RequestContext::background(), || http.get(&url))
      .await
      .unwrap_err();
    let elapsed = start.elapsed();

    match err {
      TurnError::TransportExhausted { attempts, source, .. } => {
        assert_eq!(attempts, 4);
        assert!(matches!(source, AttemptFailure::Transport(_)));
      }
      other => panic!("unexpected error: {other:?}"),
    }
    // 100ms + 200ms + 400ms of virtual time, nothing after the last attempt
    assert!(elapsed >= Duration::from_millis(700), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(800), "{elapsed:?}");
  }

  #[test]
  fn test_retryable_statuses() {
    assert!(is_retryable_status(StatusCode::INTERNAL_SERVER_ERROR));
    assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
    assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
    assert!(!is_retryable_status(StatusCode::OK));
    assert!(!is_retryable_status(StatusCode::NOT_FOUND));
    assert!(!is_retryable_status(StatusCode::UNAUTHORIZED));
  }
}
