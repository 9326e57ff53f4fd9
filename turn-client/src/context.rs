//! # Request Context
//!
//! Bounds a whole logical operation, all of its retries and backoff sleeps
//! included. A context may carry a deadline, an interruption signal, both,
//! or neither.

use std::future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

/// Why a [`RequestContext`] stopped the operation it was bounding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cancellation {
  /// The deadline passed
  DeadlineExceeded,
  /// An [`Interrupter`] fired
  Interrupted,
}

/// Handle used to interrupt every operation bound to its contexts.
#[derive(Debug)]
pub struct Interrupter {
  tx: watch::Sender<bool>,
}

impl Interrupter {
  /// Signal interruption. Idempotent.
  pub fn interrupt(&self) {
    self.tx.send_replace(true);
  }

  /// Whether [`Interrupter::interrupt`] has been called
  pub fn is_interrupted(&self) -> bool {
    *self.tx.borrow()
  }
}

/// Deadline and interruption bounds for one logical request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
  deadline: Option<Instant>,
  interrupt: Option<watch::Receiver<bool>>,
}

impl RequestContext {
  /// A context that never fires
  pub fn background() -> Self {
    Self::default()
  }

  /// A context whose deadline is `timeout` from now
  pub fn with_timeout(timeout: Duration) -> Self {
    Self::background().timeout(timeout)
  }

  /// A context plus the [`Interrupter`] that fires it
  pub fn interruptible() -> (Self, Interrupter) {
    let (tx, rx) = watch::channel(false);
    let ctx = Self {
      deadline: None,
      interrupt: Some(rx),
    };
    (ctx, Interrupter { tx })
  }

  /// Set (or tighten) the deadline to `timeout` from now
  pub fn timeout(self, timeout: Duration) -> Self {
    self.deadline_at(Instant::now() + timeout)
  }

  /// Set (or tighten) the deadline to `deadline`
  pub fn deadline_at(mut self, deadline: Instant) -> Self {
    self.deadline = Some(match self.deadline {
      Some(existing) => existing.min(deadline),
      None => deadline,
    });
    self
  }

  /// The deadline, if any
  pub const fn deadline(&self) -> Option<Instant> {
    self.deadline
  }

  /// Non-blocking check for whether the context has already fired.
  ///
  /// Interruption wins over an expired deadline.
  pub fn cancellation(&self) -> Option<Cancellation> {
    if self.interrupt.as_ref().is_some_and(|rx| *rx.borrow()) {
      return Some(Cancellation::Interrupted);
    }
    if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
      return Some(Cancellation::DeadlineExceeded);
    }
    None
  }

  /// Resolves once the context fires; pends forever for a background context.
  pub async fn done(&self) -> Cancellation {
    let deadline = async {
      match self.deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => future::pending::<()>().await,
      }
    };

    let interrupted = async {
      match &self.interrupt {
        Some(rx) => {
          let mut rx = rx.clone();
          // A dropped interrupter can never fire.
          if rx.wait_for(|interrupted| *interrupted).await.is_err() {
            future::pending::<()>().await;
          }
        }
        None => future::pending::<()>().await,
      }
    };

    tokio::select! {
      biased;
      () = interrupted => Cancellation::Interrupted,
      () = deadline => Cancellation::DeadlineExceeded,
    }
  }
}
