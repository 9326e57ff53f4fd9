//! # Configuration Management
//!
//! Optional `config.toml` in the XDG config directory, merged under command
//! line flags and their environment variables.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::Deserialize;

/// Deadline for the PR check when neither flag nor file sets one
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Deadline for resolving the authenticated GitHub user
pub const USER_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
  pub backend: Option<String>,
  pub no_cache: Option<bool>,
  pub timeout_secs: Option<u64>,
  pub include_events: Option<bool>,
}

/// Values given on the command line or through flag environment variables
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Overrides {
  pub backend: Option<String>,
  pub no_cache: bool,
  pub include_events: bool,
  pub timeout_secs: Option<u64>,
}

/// Effective settings for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
  /// `None` means the client's built-in default backend
  pub backend: Option<String>,
  pub no_cache: bool,
  pub include_events: bool,
  pub timeout: Duration,
}

impl Settings {
  /// Merge flags over the config file over built-in defaults
  pub fn resolve(overrides: Overrides, file: FileConfig) -> Self {
    let timeout_secs = overrides.timeout_secs.or(file.timeout_secs);
    Self {
      backend: overrides.backend.filter(|b| !b.is_empty()).or(file.backend),
      no_cache: overrides.no_cache || file.no_cache.unwrap_or(false),
      include_events: overrides.include_events || file.include_events.unwrap_or(false),
      timeout: timeout_secs.map_or(DEFAULT_TIMEOUT, Duration::from_secs),
    }
  }
}

/// Path of `config.toml` inside the platform config directory
pub fn config_path() -> Result<PathBuf> {
  let proj_dirs =
    ProjectDirs::from("app", "codegroove", "checkurl").context("Failed to determine project directories")?;
  Ok(proj_dirs.config_dir().join("config.toml"))
}

/// Load the config file, or the empty config when it does not exist
pub fn load_file_config() -> Result<FileConfig> {
  let path = config_path()?;
  if !path.exists() {
    return Ok(FileConfig::default());
  }
  load_from(&path)
}

/// Parse and validate the config file at `path`
pub fn load_from(path: &Path) -> Result<FileConfig> {
  let content = fs::read_to_string(path).with_context(|| format!("Failed to read config from {}", path.display()))?;
  let config: FileConfig =
    toml::from_str(&content).with_context(|| format!("Failed to parse config from {}", path.display()))?;

  if config.timeout_secs == Some(0) {
    bail!("Invalid config {}: timeout_secs must be greater than zero", path.display());
  }
  Ok(config)
}

#[cfg(test)]
mod tests {
  use tempfile::TempDir;
  use turn_test_utils::{EnvTestGuard, env_lock};

  use super::*;

  #[test]
  fn test_defaults_without_flags_or_file() {
    let settings = Settings::resolve(Overrides::default(), FileConfig::default());
    assert_eq!(
      settings,
      Settings {
        backend: None,
        no_cache: false,
        include_events: false,
        timeout: DEFAULT_TIMEOUT,
      }
    );
  }

  #[test]
  fn test_flags_override_file() {
    let file = FileConfig {
      backend: Some("https://file.example.com".to_string()),
      no_cache: Some(false),
      timeout_secs: Some(5),
      include_events: Some(true),
    };
    let overrides = Overrides {
      backend: Some("https://flag.example.com".to_string()),
      no_cache: true,
      include_events: false,
      timeout_secs: Some(60),
    };

    let settings = Settings::resolve(overrides, file);
    assert_eq!(settings.backend.as_deref(), Some("https://flag.example.com"));
    assert!(settings.no_cache);
    assert!(settings.include_events);
    assert_eq!(settings.timeout, Duration::from_secs(60));
  }

  #[test]
  fn test_file_fills_missing_flags() {
    let file = FileConfig {
      backend: Some("https://file.example.com".to_string()),
      timeout_secs: Some(5),
      ..FileConfig::default()
    };
    let overrides = Overrides {
      backend: Some(String::new()),
      ..Overrides::default()
    };

    let settings = Settings::resolve(overrides, file);
    assert_eq!(settings.backend.as_deref(), Some("https://file.example.com"));
    assert_eq!(settings.timeout, Duration::from_secs(5));
  }

  #[test]
  fn test_load_from_parses_known_keys() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("config.toml");
    fs::write(
      &path,
      "backend = \"http://localhost:8080\"\nno_cache = true\ntimeout_secs = 12\ninclude_events = true\n",
    )?;

    let config = load_from(&path)?;
    assert_eq!(
      config,
      FileConfig {
        backend: Some("http://localhost:8080".to_string()),
        no_cache: Some(true),
        timeout_secs: Some(12),
        include_events: Some(true),
      }
    );
    Ok(())
  }

  #[test]
  fn test_load_from_rejects_unknown_keys_and_zero_timeout() -> anyhow::Result<()> {
    let dir = TempDir::new()?;

    let unknown = dir.path().join("unknown.toml");
    fs::write(&unknown, "backnd = \"typo\"\n")?;
    let err = load_from(&unknown).unwrap_err();
    assert!(format!("{err:#}").contains("Failed to parse config"));

    let zero = dir.path().join("zero.toml");
    fs::write(&zero, "timeout_secs = 0\n")?;
    let err = load_from(&zero).unwrap_err();
    assert!(err.to_string().contains("timeout_secs must be greater than zero"));
    Ok(())
  }

  #[cfg(target_os = "linux")]
  #[test]
  fn test_load_file_config_uses_xdg_config_home() -> anyhow::Result<()> {
    let _lock = env_lock();
    let env = EnvTestGuard::new();

    assert_eq!(load_file_config()?, FileConfig::default());

    env.write_config("checkurl/config.toml", "no_cache = true\n");
    assert_eq!(config_path()?, env.config_dir().join("checkurl").join("config.toml"));
    assert_eq!(load_file_config()?.no_cache, Some(true));
    Ok(())
  }
}
