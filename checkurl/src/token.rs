//! GitHub token discovery.
//!
//! Looks at `GITHUB_TOKEN`, then `GH_TOKEN`, then asks the `gh` CLI.

use std::env;
use std::process::{Command, Stdio};

use tracing::debug;

const TOKEN_VARS: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];

/// Find a GitHub token for the current user, if one is available
pub fn discover_token() -> Option<String> {
  discover_token_with(|name| env::var(name).ok(), gh_auth_token)
}

fn discover_token_with<L, F>(lookup: L, fallback: F) -> Option<String>
where
  L: Fn(&str) -> Option<String>,
  F: FnOnce() -> Option<String>,
{
  for name in TOKEN_VARS {
    if let Some(token) = lookup(name).as_deref().and_then(non_empty) {
      debug!("using GitHub token from {name}");
      return Some(token);
    }
  }

  let token = fallback().as_deref().and_then(non_empty);
  if token.is_some() {
    debug!("using GitHub token from gh CLI");
  }
  token
}

/// Run `gh auth token` with its stderr suppressed
fn gh_auth_token() -> Option<String> {
  let output = Command::new("gh")
    .args(["auth", "token"])
    .stdin(Stdio::null())
    .stderr(Stdio::null())
    .output()
    .inspect_err(|e| debug!("gh CLI unavailable: {e}"))
    .ok()?;

  if !output.status.success() {
    debug!("gh auth token exited with {}", output.status);
    return None;
  }
  String::from_utf8(output.stdout).ok()
}

fn non_empty(token: &str) -> Option<String> {
  let token = token.trim();
  (!token.is_empty()).then(|| token.to_string())
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use turn_test_utils::{TokenEnvGuard, env_lock};

  use super::*;

  fn lookup_in(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |name| vars.get(name).cloned()
  }

  #[test]
  fn test_github_token_wins() {
    let token = discover_token_with(lookup_in(&[("GITHUB_TOKEN", "primary"), ("GH_TOKEN", "secondary")]), || {
      panic!("gh should not be consulted")
    });
    assert_eq!(token.as_deref(), Some("primary"));
  }

  #[test]
  fn test_gh_token_used_when_github_token_blank() {
    let token = discover_token_with(lookup_in(&[("GITHUB_TOKEN", "  "), ("GH_TOKEN", " secondary\n")]), || None);
    assert_eq!(token.as_deref(), Some("secondary"));
  }

  #[test]
  fn test_falls_back_to_gh_cli_output() {
    let token = discover_token_with(lookup_in(&[]), || Some("gho_fromcli\n".to_string()));
    assert_eq!(token.as_deref(), Some("gho_fromcli"));
  }

  #[test]
  fn test_blank_gh_output_means_no_token() {
    assert_eq!(discover_token_with(lookup_in(&[]), || Some("\n".to_string())), None);
    assert_eq!(discover_token_with(lookup_in(&[]), || None), None);
  }

  #[test]
  fn test_discover_token_reads_process_environment() {
    let _lock = env_lock();

    {
      let _guard = TokenEnvGuard::github_token(" env-token ");
      assert_eq!(discover_token().as_deref(), Some("env-token"));
    }

    {
      let _guard = TokenEnvGuard::gh_token("gh-env-token");
      assert_eq!(discover_token().as_deref(), Some("gh-env-token"));
    }
  }
}
