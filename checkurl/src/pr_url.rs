//! GitHub pull request URL validation.

use std::sync::LazyLock;

use anyhow::{Result, bail};
use regex::Regex;

static PR_URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^https?://(www\.)?github\.com/[^/\s]+/[^/\s]+/pull/\d+(/\S*)?$")
    .expect("Failed to compile GitHub PR URL regex")
});

/// Accept `http(s)://[www.]github.com/<owner>/<repo>/pull/<n>` with an
/// optional trailing path such as `/files`
pub fn validate_pr_url(url: &str) -> Result<()> {
  if url.is_empty() {
    bail!("PR URL cannot be empty");
  }
  if !PR_URL_PATTERN.is_match(url) {
    bail!("invalid GitHub PR URL: {url} (expected https://github.com/<owner>/<repo>/pull/<number>)");
  }
  Ok(())
}
