//! # Command Line Interface
//!
//! Argument parsing and the check flow: validate the PR URL, resolve
//! settings and credentials, determine the user, ask the Turn backend and
//! print its answer.

#![allow(clippy::print_stdout)]

use std::process::ExitCode;

use anyhow::{Context, Result, anyhow, bail};
use chrono::Utc;
use clap::{ArgAction, Parser};
use tracing::{Dispatch, debug, info};
use turn_client::{RequestContext, TurnClient, TurnError, sanitize_for_log};

use crate::config::{self, Overrides, Settings, USER_LOOKUP_TIMEOUT};
use crate::output::{ColorMode, cli_styles, print_info, print_warning};
use crate::pr_url::validate_pr_url;
use crate::token::discover_token;

const LONG_VERSION: &str = concat!(
  env!("CARGO_PKG_VERSION"),
  "\ncommit: ",
  env!("GIT_HASH"),
  "\nbuilt: ",
  env!("BUILD_TIMESTAMP"),
  "\ntarget: ",
  env!("TARGET"),
);

/// Top-level CLI command for checkurl
#[derive(Parser, Debug)]
#[command(name = "checkurl")]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
#[command(about = "Check whether a GitHub pull request is blocked on a user")]
#[command(
  long_about = "Asks the Turn review-state service who has to act on a GitHub pull request\n\
        and prints the analysis as JSON.\n\n\
        Exits with status 0 when nobody is blocking the PR and 1 when someone is\n\
        (or when the check fails)."
)]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_version = LONG_VERSION)]
#[command(max_term_width = 120)]
#[command(styles = cli_styles())]
#[command(after_help = "Examples:\n  \
        checkurl https://github.com/owner/repo/pull/123\n  \
        checkurl --backend https://api.example.com https://github.com/owner/repo/pull/123\n  \
        checkurl --user octocat https://github.com/owner/repo/pull/123\n  \
        checkurl -vv https://github.com/owner/repo/pull/123")]
pub struct Cli {
  /// Sets the level of verbosity (can be used multiple times)
  #[arg(
    short = 'v',
    long = "verbose",
    action = ArgAction::Count,
    long_help = "Sets the level of verbosity for tracing and logging output.\n\n\
             -v: Show info level messages\n\
             -vv: Show debug level messages\n\
             -vvv: Show trace level messages"
  )]
  pub verbose: u8,

  /// Controls when colored output is used
  #[arg(long, value_enum, ignore_case = true, default_value_t = ColorMode::Auto)]
  pub colors: ColorMode,

  /// Turn backend URL
  #[arg(long, env = "TURN_BACKEND", value_name = "URL")]
  pub backend: Option<String>,

  /// GitHub username to check (defaults to the authenticated user)
  #[arg(long, value_name = "NAME")]
  pub user: Option<String>,

  /// Ask the backend to bypass its cache
  #[arg(long)]
  pub no_cache: bool,

  /// Include the PR event timeline in the result
  #[arg(long)]
  pub events: bool,

  /// Deadline for the check in seconds, retries included
  #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
  pub timeout: Option<u64>,

  /// GitHub pull request URL, e.g. https://github.com/owner/repo/pull/123
  #[arg(value_name = "PR_URL")]
  pub pr_url: String,
}

impl Cli {
  /// The settings given on the command line
  pub fn overrides(&self) -> Overrides {
    Overrides {
      backend: self.backend.clone(),
      no_cache: self.no_cache,
      include_events: self.events,
      timeout_secs: self.timeout,
    }
  }
}

pub fn handle_cli(cli: Cli) -> Result<ExitCode> {
  cli.colors.apply();

  let rt = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
  rt.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<ExitCode> {
  validate_pr_url(&cli.pr_url)?;
  info!("checking PR: {}", sanitize_for_log(&cli.pr_url));

  let settings = Settings::resolve(cli.overrides(), config::load_file_config()?);
  debug!("resolved settings: {settings:?}");

  let user = cli.user.clone().filter(|user| !user.is_empty());
  let token = discover_token();
  match (&token, &user) {
    (None, None) => bail!(
      "No GitHub token found and no username specified.\n\
       To authenticate, run 'gh auth login' or set the GITHUB_TOKEN environment variable.\n\
       Alternatively, pass --user <NAME> to check a specific user."
    ),
    (None, Some(_)) => print_warning("No GitHub token found. API requests may be rate limited."),
    (Some(_), _) => debug!("GitHub token found"),
  }

  let client = build_client(&settings, token, cli.verbose)?;

  let (ctx, interrupter) = RequestContext::interruptible();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      debug!("received Ctrl-C, interrupting");
      interrupter.interrupt();
    }
  });

  let user = match user {
    Some(user) => {
      info!("using specified user: {}", sanitize_for_log(&user));
      user
    }
    None => {
      let lookup_ctx = ctx.clone().timeout(USER_LOOKUP_TIMEOUT);
      let login = client
        .current_user(&lookup_ctx)
        .await
        .map_err(|e| describe_failure(e, "get current GitHub user", USER_LOOKUP_TIMEOUT.as_secs()))?;
      print_info(&format!("Using authenticated user: {login}"));
      login
    }
  };

  let check_ctx = ctx.timeout(settings.timeout);
  let result = client
    .check(&check_ctx, &cli.pr_url, &user, Utc::now())
    .await
    .map_err(|e| describe_failure(e, "check PR", settings.timeout.as_secs()))?;

  info!(
    "check complete: blocked={}, critical users: {}",
    result.is_blocked(),
    result.critical_users().collect::<Vec<_>>().join(", ")
  );

  let pretty = serde_json::to_string_pretty(&result).context("Failed to format response")?;
  println!("{pretty}");

  Ok(if result.is_blocked() {
    ExitCode::FAILURE
  } else {
    ExitCode::SUCCESS
  })
}

fn build_client(settings: &Settings, token: Option<String>, verbose: u8) -> Result<TurnClient> {
  // The client stays silent unless verbose output was requested
  let logger = (verbose > 0).then(|| tracing::dispatcher::get_default(Dispatch::clone));

  let mut builder = TurnClient::builder()
    .logger(logger)
    .no_cache(settings.no_cache)
    .include_events(settings.include_events);
  if let Some(backend) = &settings.backend {
    debug!("using backend: {}", sanitize_for_log(backend));
    builder = builder.backend(backend);
  }
  if let Some(token) = token {
    builder = builder.auth_token(token);
  }

  builder.build().context("Failed to create client")
}

/// Give interruption and deadline expiry their own messages
fn describe_failure(err: TurnError, action: &str, timeout_secs: u64) -> anyhow::Error {
  match err {
    TurnError::Interrupted { .. } => anyhow!("Interrupted while trying to {action}"),
    e @ TurnError::Timeout { .. } => {
      anyhow::Error::new(e).context(format!("Timed out after {timeout_secs}s trying to {action}"))
    }
    other => anyhow::Error::new(other).context(format!("Failed to {action}")),
  }
}

#[cfg(test)]
mod tests {
  use clap::CommandFactory;

  use super::*;

  #[test]
  fn test_cli_definition_is_consistent() {
    Cli::command().debug_assert();
  }

  #[test]
  fn test_parse_all_flags() {
    let cli = Cli::try_parse_from([
      "checkurl",
      "-vv",
      "--backend",
      "http://localhost:8080",
      "--user",
      "octocat",
      "--no-cache",
      "--events",
      "--timeout",
      "5",
      "https://github.com/owner/repo/pull/1",
    ])
    .unwrap();

    assert_eq!(cli.verbose, 2);
    assert_eq!(cli.user.as_deref(), Some("octocat"));
    assert_eq!(cli.pr_url, "https://github.com/owner/repo/pull/1");
    assert_eq!(
      cli.overrides(),
      Overrides {
        backend: Some("http://localhost:8080".to_string()),
        no_cache: true,
        include_events: true,
        timeout_secs: Some(5),
      }
    );
  }

  #[test]
  fn test_pr_url_is_required_and_timeout_positive() {
    assert!(Cli::try_parse_from(["checkurl"]).is_err());
    assert!(Cli::try_parse_from(["checkurl", "--timeout", "0", "https://github.com/o/r/pull/1"]).is_err());
  }

  #[test]
  fn test_describe_failure_messages() {
    let interrupted = describe_failure(TurnError::Interrupted { operation: "check" }, "check PR", 30);
    assert_eq!(interrupted.to_string(), "Interrupted while trying to check PR");

    let timeout = describe_failure(
      TurnError::Timeout {
        operation: "check",
        last: None,
      },
      "check PR",
      30,
    );
    assert_eq!(timeout.to_string(), "Timed out after 30s trying to check PR");

    let rejected = describe_failure(
      TurnError::RemoteRejected {
        operation: "check",
        status: 404,
        body: "not found".to_string(),
      },
      "check PR",
      30,
    );
    assert_eq!(rejected.to_string(), "Failed to check PR");
    assert!(format!("{rejected:#}").contains("404"));
  }
}
