//! GitHub token variable isolation
//!
//! Token discovery reads `GITHUB_TOKEN` and `GH_TOKEN` from the process
//! environment. [`TokenEnvGuard`] pins both for the lifetime of a test.

use std::env;

use crate::env::restore_var;

/// Overrides `GITHUB_TOKEN` and `GH_TOKEN`, restoring them on drop
pub struct TokenEnvGuard {
  original_github_token: Option<String>,
  original_gh_token: Option<String>,
}

impl TokenEnvGuard {
  pub const GITHUB_TOKEN: &'static str = "GITHUB_TOKEN";
  pub const GH_TOKEN: &'static str = "GH_TOKEN";

  /// Remove both token variables
  pub fn cleared() -> Self {
    Self::with(None, None)
  }

  /// Set `GITHUB_TOKEN` and remove `GH_TOKEN`
  pub fn github_token(token: &str) -> Self {
    Self::with(Some(token), None)
  }

  /// Set `GH_TOKEN` and remove `GITHUB_TOKEN`
  pub fn gh_token(token: &str) -> Self {
    Self::with(None, Some(token))
  }

  /// Set or remove each variable explicitly
  pub fn with(github_token: Option<&str>, gh_token: Option<&str>) -> Self {
    let guard = Self {
      original_github_token: env::var(Self::GITHUB_TOKEN).ok(),
      original_gh_token: env::var(Self::GH_TOKEN).ok(),
    };
    restore_var(Self::GITHUB_TOKEN, github_token);
    restore_var(Self::GH_TOKEN, gh_token);
    guard
  }
}

impl Drop for TokenEnvGuard {
  fn drop(&mut self) {
    restore_var(Self::GITHUB_TOKEN, self.original_github_token.as_deref());
    restore_var(Self::GH_TOKEN, self.original_gh_token.as_deref());
  }
}
