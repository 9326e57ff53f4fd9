//! Environment variable management for testing
//!
//! This module provides utilities for redirecting the XDG base directories
//! during testing so configuration lookups never touch the real user's files.

use std::env;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use tempfile::TempDir;

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Serialise tests that read or write process environment variables.
///
/// A test that panicked while holding the lock does not poison it for the
/// rest of the suite.
pub fn env_lock() -> MutexGuard<'static, ()> {
  ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Restore `name` to `original`, removing it when it was unset
pub(crate) fn restore_var(name: &str, original: Option<&str>) {
  // SAFETY: callers hold `env_lock`, so no other test thread touches the
  // environment concurrently.
  match original {
    Some(val) => unsafe {
      env::set_var(name, val);
    },
    None => unsafe {
      env::remove_var(name);
    },
  }
}

/// A test environment that overrides XDG directories to use a per-test
/// temporary directory
pub struct EnvTestGuard {
  /// The temporary directory that will be used for XDG directories
  pub temp_dir: TempDir,
  /// The original XDG_CONFIG_HOME value, if any
  original_config_home: Option<String>,
  /// The original XDG_CACHE_HOME value, if any
  original_cache_home: Option<String>,
}

impl Default for EnvTestGuard {
  fn default() -> Self {
    Self::new()
  }
}

impl EnvTestGuard {
  /// XDG environment variable names
  pub const XDG_CONFIG_HOME: &'static str = "XDG_CONFIG_HOME";
  pub const XDG_CACHE_HOME: &'static str = "XDG_CACHE_HOME";

  /// Create a new test environment with overridden XDG directories
  pub fn new() -> Self {
    let temp_dir = TempDir::new().expect("Failed to create temporary directory");

    let original_config_home = env::var(Self::XDG_CONFIG_HOME).ok();
    let original_cache_home = env::var(Self::XDG_CACHE_HOME).ok();

    let temp_path = temp_dir.path().to_path_buf();
    // SAFETY: callers hold `env_lock` for the lifetime of the guard.
    unsafe {
      env::set_var(Self::XDG_CONFIG_HOME, temp_path.join("config"));
      env::set_var(Self::XDG_CACHE_HOME, temp_path.join("cache"));
    }

    std::fs::create_dir_all(temp_path.join("config")).expect("Failed to create config directory");
    std::fs::create_dir_all(temp_path.join("cache")).expect("Failed to create cache directory");

    Self {
      temp_dir,
      original_config_home,
      original_cache_home,
    }
  }

  /// Get the path to the XDG config directory
  pub fn config_dir(&self) -> PathBuf {
    self.temp_dir.path().join("config")
  }

  /// Get the path to the XDG cache directory
  pub fn cache_dir(&self) -> PathBuf {
    self.temp_dir.path().join("cache")
  }

  /// Write `contents` to `relative` under the XDG config directory, creating
  /// parent directories as needed
  pub fn write_config(&self, relative: &str, contents: &str) -> PathBuf {
    let path = self.config_dir().join(relative);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).expect("Failed to create config parent directory");
    }
    std::fs::write(&path, contents).expect("Failed to write config file");
    path
  }
}

impl Drop for EnvTestGuard {
  fn drop(&mut self) {
    restore_var(Self::XDG_CONFIG_HOME, self.original_config_home.as_deref());
    restore_var(Self::XDG_CACHE_HOME, self.original_cache_home.as_deref());
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_guard_redirects_and_restores_config_home() {
    let _lock = env_lock();
    let before = env::var(EnvTestGuard::XDG_CONFIG_HOME).ok();

    {
      let guard = EnvTestGuard::new();
      assert_eq!(
        env::var(EnvTestGuard::XDG_CONFIG_HOME).ok().map(PathBuf::from),
        Some(guard.config_dir())
      );
      assert!(guard.config_dir().is_dir());

      let written = guard.write_config("app/config.toml", "key = 1\n");
      assert_eq!(std::fs::read_to_string(written).unwrap(), "key = 1\n");
    }

    assert_eq!(env::var(EnvTestGuard::XDG_CONFIG_HOME).ok(), before);
  }
}
