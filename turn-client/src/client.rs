//! # Turn HTTP Client
//!
//! Client state and construction for the Turn review-state service: backend
//! validation, authentication, cache bypass, per-client diagnostic sink and
//! the shared request pipeline used by every endpoint.

use std::future::Future;

use reqwest::{Client, RequestBuilder, StatusCode};
use tracing::Dispatch;
use tracing::debug;
use tracing::instrument::WithSubscriber;
use url::Url;

use crate::consts::{CLIENT_TIMEOUT, DEFAULT_BACKEND, GITHUB_API_BASE_URL, MAX_RESPONSE_SIZE};
use crate::context::RequestContext;
use crate::error::{Result, TurnError};
use crate::response::read_capped;
use crate::retry::{RetryPolicy, cancelled, send_with_retry};

/// Client for the Turn API.
///
/// Methods taking `&self` are safe to call concurrently; the `set_*` methods
/// take `&mut self` and therefore cannot overlap with in-flight requests.
#[derive(Debug, Clone)]
pub struct TurnClient {
  pub(crate) http: Client,
  pub(crate) base_url: String,
  pub(crate) github_api_url: String,
  pub(crate) auth_token: Option<String>,
  pub(crate) no_cache: bool,
  pub(crate) include_events: bool,
  pub(crate) retry: RetryPolicy,
  /// Diagnostic sink; discards everything until [`TurnClient::set_logger`]
  pub(crate) logger: Dispatch,
}

impl TurnClient {
  /// Create a client for the backend at `base_url`.
  ///
  /// The URL must parse, use `http` or `https` and name a host. Trailing
  /// slashes are removed.
  pub fn new(base_url: &str) -> Result<Self> {
    let base_url = validate_backend(base_url)?;
    let http = Client::builder()
      .timeout(CLIENT_TIMEOUT)
      .build()
      .map_err(|e| TurnError::InvalidConfiguration(format!("failed to build HTTP client: {e}")))?;

    Ok(Self {
      http,
      base_url,
      github_api_url: GITHUB_API_BASE_URL.to_string(),
      auth_token: None,
      no_cache: false,
      include_events: false,
      retry: RetryPolicy::default(),
      logger: Dispatch::none(),
    })
  }

  /// Create a client for [`DEFAULT_BACKEND`]
  pub fn with_defaults() -> Result<Self> {
    Self::new(DEFAULT_BACKEND)
  }

  /// Start building a client from options
  pub fn builder() -> TurnClientBuilder {
    TurnClientBuilder::default()
  }

  /// The normalized backend URL
  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  /// Whether an auth token is configured
  pub const fn has_auth_token(&self) -> bool {
    self.auth_token.is_some()
  }

  /// Whether cache bypass is enabled
  pub const fn no_cache(&self) -> bool {
    self.no_cache
  }

  /// The retry policy in effect
  pub const fn retry_policy(&self) -> &RetryPolicy {
    &self.retry
  }

  /// Point the client at another backend, validating it like [`TurnClient::new`]
  pub fn set_backend(&mut self, base_url: &str) -> Result<()> {
    self.base_url = validate_backend(base_url)?;
    Ok(())
  }

  /// Set the GitHub token sent as a bearer credential. An empty token clears it.
  pub fn set_auth_token(&mut self, token: impl Into<String>) {
    let token = token.into();
    self.auth_token = (!token.is_empty()).then_some(token);
  }

  /// Route this client's diagnostics to `logger`. Pass
  /// `tracing::dispatcher::get_default(Dispatch::clone)` to use the process
  /// subscriber.
  pub fn set_logger(&mut self, logger: Dispatch) {
    self.logger = logger;
  }

  /// Ask the backend to skip cached results
  pub fn set_no_cache(&mut self, no_cache: bool) {
    self.no_cache = no_cache;
  }

  /// Request the full event timeline in check responses
  pub fn include_events(&mut self) {
    self.include_events = true;
  }

  /// Replace the retry policy
  pub fn set_retry_policy(&mut self, policy: RetryPolicy) {
    self.retry = policy;
  }

  /// Run `fut` with this client's diagnostic sink
  pub(crate) async fn scoped<F: Future>(&self, fut: F) -> F::Output {
    fut.with_subscriber(self.logger.clone()).await
  }

  /// Attach the bearer token, if any
  pub(crate) fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
    match &self.auth_token {
      Some(token) => builder.bearer_auth(token),
      None => builder,
    }
  }

  /// Send through the retrying transport and read the final body, bounded
  /// by [`MAX_RESPONSE_SIZE`] and by `ctx`.
  pub(crate) async fn execute<F>(
    &self,
    operation: &'static str,
    ctx: &RequestContext,
    build: F,
  ) -> Result<(StatusCode, Vec<u8>)>
  where
    F: Fn() -> RequestBuilder,
  {
    let response = send_with_retry(operation, &self.retry, ctx, build).await?;
    let status = response.status();

    let body = tokio::select! {
      biased;
      cancellation = ctx.done() => {
        return Err(cancelled(operation, cancellation, None));
      }
      body = read_capped(response, MAX_RESPONSE_SIZE) => body.map_err(|source| TurnError::Http { operation, source })?,
    };

    debug!("received response: status={}", status.as_u16());
    Ok((status, body))
  }
}

/// Options-style construction for [`TurnClient`]
#[derive(Debug, Default)]
pub struct TurnClientBuilder {
  backend: Option<String>,
  logger: Option<Dispatch>,
  auth_token: Option<String>,
  no_cache: bool,
  include_events: bool,
  retry: Option<RetryPolicy>,
}

impl TurnClientBuilder {
  /// Use a custom backend instead of [`DEFAULT_BACKEND`]
  pub fn backend(mut self, base_url: impl Into<String>) -> Self {
    self.backend = Some(base_url.into());
    self
  }

  /// Diagnostic sink; `None` keeps the default
  pub fn logger(mut self, logger: Option<Dispatch>) -> Self {
    if logger.is_some() {
      self.logger = logger;
    }
    self
  }

  pub fn auth_token(mut self, token: impl Into<String>) -> Self {
    self.auth_token = Some(token.into());
    self
  }

  pub const fn no_cache(mut self, no_cache: bool) -> Self {
    self.no_cache = no_cache;
    self
  }

  pub const fn include_events(mut self, include_events: bool) -> Self {
    self.include_events = include_events;
    self
  }

  pub const fn retry_policy(mut self, policy: RetryPolicy) -> Self {
    self.retry = Some(policy);
    self
  }

  /// Build the client, validating the backend
  pub fn build(self) -> Result<TurnClient> {
    let mut client = TurnClient::with_defaults()?;
    if let Some(backend) = self.backend.as_deref() {
      client.set_backend(backend)?;
    }
    if let Some(logger) = self.logger {
      client.set_logger(logger);
    }
    if let Some(token) = self.auth_token {
      client.set_auth_token(token);
    }
    if let Some(policy) = self.retry {
      client.set_retry_policy(policy);
    }
    client.no_cache = self.no_cache;
    client.include_events = self.include_events;
    Ok(client)
  }
}

/// Check a backend URL and return it without trailing slashes
fn validate_backend(base_url: &str) -> Result<String> {
  if base_url.is_empty() {
    return Err(TurnError::InvalidConfiguration("base URL cannot be empty".to_string()));
  }

  let parsed =
    Url::parse(base_url).map_err(|e| TurnError::InvalidConfiguration(format!("invalid base URL: {e}")))?;

  if !matches!(parsed.scheme(), "http" | "https") {
    return Err(TurnError::InvalidConfiguration(
      "base URL must use http or https".to_string(),
    ));
  }

  if parsed.host_str().is_none_or(str::is_empty) {
    return Err(TurnError::InvalidConfiguration("base URL must include a host".to_string()));
  }

  Ok(base_url.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_new_accepts_http_and_https() {
    for url in ["https://api.example.com", "http://localhost:8080"] {
      let client = TurnClient::new(url).unwrap();
      assert_eq!(client.base_url(), url);
    }
  }

  #[test]
  fn test_new_strips_trailing_slash() {
    let client = TurnClient::new("https://x/").unwrap();
    assert_eq!(client.base_url(), "https://x");

    let client = TurnClient::new("https://api.example.com/turn//").unwrap();
    assert_eq!(client.base_url(), "https://api.example.com/turn");
  }

  #[test]
  fn test_new_rejects_bad_urls() {
    for url in ["", "ftp://x", "not a url", "ftp://example.com", "file:///etc/passwd"] {
      let err = TurnClient::new(url).unwrap_err();
      assert!(
        matches!(err, TurnError::InvalidConfiguration(_)),
        "{url:?} gave {err:?}"
      );
    }
  }

  #[test]
  fn test_with_defaults_uses_default_backend() {
    let client = TurnClient::with_defaults().unwrap();
    assert_eq!(client.base_url(), DEFAULT_BACKEND);
    assert!(!client.has_auth_token());
    assert!(!client.no_cache());
    assert_eq!(*client.retry_policy(), RetryPolicy::default());
  }

  #[test]
  fn test_set_backend_revalidates() {
    let mut client = TurnClient::with_defaults().unwrap();
    assert!(client.set_backend("ftp://invalid.com").is_err());
    assert_eq!(client.base_url(), DEFAULT_BACKEND);

    client.set_backend("https://custom.example.com/").unwrap();
    assert_eq!(client.base_url(), "https://custom.example.com");
  }

  #[test]
  fn test_empty_token_clears_auth() {
    let mut client = TurnClient::with_defaults().unwrap();
    client.set_auth_token("test-token");
    assert!(client.has_auth_token());
    client.set_auth_token("");
    assert!(!client.has_auth_token());
  }

  #[test]
  fn test_builder_defaults_to_default_backend() {
    let client = TurnClient::builder().build().unwrap();
    assert_eq!(client.base_url(), DEFAULT_BACKEND);
  }

  #[test]
  fn test_builder_with_multiple_options() {
    let client = TurnClient::builder()
      .backend("https://multi.example.com")
      .auth_token("multi-token")
      .logger(Some(Dispatch::none()))
      .no_cache(true)
      .include_events(true)
      .retry_policy(RetryPolicy::no_retries())
      .build()
      .unwrap();

    assert_eq!(client.base_url(), "https://multi.example.com");
    assert_eq!(client.auth_token.as_deref(), Some("multi-token"));
    assert!(client.logger.is::<tracing::subscriber::NoSubscriber>());
    assert!(client.no_cache());
    assert!(client.include_events);
    assert_eq!(client.retry_policy().max_attempts, 1);
  }

  #[test]
  fn test_builder_none_logger_keeps_default() {
    let client = TurnClient::builder().logger(None).build().unwrap();
    assert!(client.logger.is::<tracing::subscriber::NoSubscriber>());
  }

  #[test]
  fn test_builder_rejects_invalid_backend() {
    let err = TurnClient::builder().backend("ftp://invalid.com").build().unwrap_err();
    assert!(matches!(err, TurnError::InvalidConfiguration(_)));
  }
}
