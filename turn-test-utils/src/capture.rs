//! In-memory tracing output for assertions
//!
//! [`LogCapture`] is a [`MakeWriter`] backed by a shared buffer. Hand its
//! [`LogCapture::dispatch`] to the code under test, then inspect what was
//! written.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{Dispatch, Level};
use tracing_subscriber::fmt::MakeWriter;

/// Shared buffer collecting formatted tracing output
#[derive(Debug, Clone, Default)]
pub struct LogCapture {
  buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
  pub fn new() -> Self {
    Self::default()
  }

  /// A dispatcher that records every event, down to TRACE, without ANSI
  /// colours or timestamps
  pub fn dispatch(&self) -> Dispatch {
    let subscriber = tracing_subscriber::fmt()
      .with_writer(self.clone())
      .with_max_level(Level::TRACE)
      .with_ansi(false)
      .without_time()
      .finish();
    Dispatch::new(subscriber)
  }

  /// Everything captured so far
  pub fn contents(&self) -> String {
    String::from_utf8_lossy(&self.lock()).into_owned()
  }

  /// Number of captured lines containing `needle`
  pub fn count(&self, needle: &str) -> usize {
    self.contents().lines().filter(|line| line.contains(needle)).count()
  }

  fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
    self.buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}

impl io::Write for LogCapture {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    self.lock().extend_from_slice(buf);
    Ok(buf.len())
  }

  fn flush(&mut self) -> io::Result<()> {
    Ok(())
  }
}

impl<'a> MakeWriter<'a> for LogCapture {
  type Writer = Self;

  fn make_writer(&'a self) -> Self::Writer {
    self.clone()
  }
}
