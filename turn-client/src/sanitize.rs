//! # Log Sanitizing
//!
//! Helpers that make third-party strings (PR URLs, usernames, response
//! excerpts) safe to hand to the tracing sink: bounded length, single line,
//! no raw control characters.

use crate::consts::{ERROR_MAX_LENGTH, LOG_MAX_LENGTH};

/// Marker appended to log fragments that were cut short
pub const LOG_TRUNCATION_MARKER: &str = "...";

/// Marker appended to error body excerpts that were cut short
pub const ERROR_TRUNCATION_MARKER: &str = "... (truncated)";

/// Map an arbitrary string to a single-line fragment safe for diagnostics.
///
/// The input is cut to [`LOG_MAX_LENGTH`] characters first. Newline, carriage
/// return and tab become the two-character escapes `\n`, `\r` and `\t`; every
/// other control character (below U+0020, plus DEL) is dropped.
pub fn sanitize_for_log(input: &str) -> String {
  let (head, truncated) = truncate_chars(input, LOG_MAX_LENGTH);

  let mut out = String::with_capacity(head.len() + LOG_TRUNCATION_MARKER.len());
  for c in head.chars() {
    match c {
      '\n' => out.push_str("\\n"),
      '\r' => out.push_str("\\r"),
      '\t' => out.push_str("\\t"),
      c if (c as u32) < 0x20 || c == '\u{7f}' => {}
      c => out.push(c),
    }
  }

  if truncated {
    out.push_str(LOG_TRUNCATION_MARKER);
  }
  out
}

/// Shorten an error body for inclusion in an error value.
///
/// Keeps at most [`ERROR_MAX_LENGTH`] characters and appends
/// [`ERROR_TRUNCATION_MARKER`] when anything was dropped.
pub fn truncate_error_body(body: &str) -> String {
  match truncate_chars(body, ERROR_MAX_LENGTH) {
    (head, true) => format!("{head}{ERROR_TRUNCATION_MARKER}"),
    (head, false) => head.to_string(),
  }
}

/// Split `input` after `max` characters without breaking a UTF-8 sequence.
fn truncate_chars(input: &str, max: usize) -> (&str, bool) {
  match input.char_indices().nth(max) {
    Some((idx, _)) => (&input[..idx], true),
    None => (input, false),
  }
}
