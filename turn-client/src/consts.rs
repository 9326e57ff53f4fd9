//! Constants for the turn-client

use std::time::Duration;

/// Base URL of the hosted Turn service
pub const DEFAULT_BACKEND: &str = "https://turn.github.codegroove.app";

/// Base URL for the official SaaS GitHub API
pub const GITHUB_API_BASE_URL: &str = "https://api.github.com";

/// User-Agent header value sent on every request
pub const USER_AGENT: &str = concat!("turnclient/", env!("CARGO_PKG_VERSION"));

/// Accept header value for the Turn API
pub const ACCEPT_JSON: &str = "application/json";

/// Accept header value for the GitHub API
pub const ACCEPT_GITHUB: &str = "application/vnd.github.v3+json";

/// Path of the PR validation endpoint, relative to the backend
pub const VALIDATE_PATH: &str = "/v1/validate";

/// Upper bound on bytes read from any response body (1 MiB)
pub const MAX_RESPONSE_SIZE: usize = 1024 * 1024;

/// Overall timeout applied by the pooled HTTP transport
pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum characters of an untrusted string that reach the log
pub const LOG_MAX_LENGTH: usize = 100;

/// Maximum characters of an error body kept in [`crate::TurnError::RemoteRejected`]
pub const ERROR_MAX_LENGTH: usize = 500;
