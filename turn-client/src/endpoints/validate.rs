//! # PR Validation Endpoint
//!
//! `POST /v1/validate`: asks the Turn service who, if anyone, has to act on
//! a pull request.

use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE, USER_AGENT};
use tracing::{debug, instrument, trace};

use crate::client::TurnClient;
use crate::consts::{ACCEPT_JSON, USER_AGENT as USER_AGENT_VALUE, VALIDATE_PATH};
use crate::context::RequestContext;
use crate::error::{Result, TurnError};
use crate::models::{CheckRequest, CheckResponse};
use crate::response::decode_json;
use crate::sanitize::sanitize_for_log;

const OPERATION: &str = "check";

impl TurnClient {
  /// Ask the backend whether the PR at `pr_url` is blocked on `user`.
  ///
  /// `updated_at` is the caller's last-known update time of the PR; the
  /// server keys its cache on it, so the zero value (Unix epoch) is rejected.
  pub async fn check(
    &self,
    ctx: &RequestContext,
    pr_url: &str,
    user: &str,
    updated_at: DateTime<Utc>,
  ) -> Result<CheckResponse> {
    self.scoped(self.check_inner(ctx, pr_url, user, updated_at)).await
  }

  #[instrument(skip_all, level = "debug")]
  async fn check_inner(
    &self,
    ctx: &RequestContext,
    pr_url: &str,
    user: &str,
    updated_at: DateTime<Utc>,
  ) -> Result<CheckResponse> {
    let request = build_check_request(pr_url, user, updated_at, self.include_events)?;
    debug!(
      "checking PR {} for user {}",
      sanitize_for_log(&request.url),
      sanitize_for_log(&request.user)
    );

    let body = serde_json::to_vec(&request)
      .map_err(|e| TurnError::InvalidArgument(format!("failed to encode request: {e}")))?;
    trace!("request JSON: {}", sanitize_for_log(&String::from_utf8_lossy(&body)));

    let endpoint = format!("{}{}", self.base_url, VALIDATE_PATH);
    debug!("sending request to {}", sanitize_for_log(&endpoint));

    let (status, bytes) = self
      .execute(OPERATION, ctx, || {
        let builder = self
          .http
          .post(&endpoint)
          .header(CONTENT_TYPE, "application/json")
          .header(USER_AGENT, USER_AGENT_VALUE)
          .header(ACCEPT, ACCEPT_JSON)
          .body(body.clone());
        let builder = self.authorize(builder);
        if self.no_cache {
          builder.header(CACHE_CONTROL, "no-cache")
        } else {
          builder
        }
      })
      .await?;

    let result: CheckResponse = decode_json(OPERATION, status, &bytes)?;
    debug!("check complete: {} actions assigned", result.analysis.next_action.len());
    Ok(result)
  }
}

/// Validate caller input and assemble the request body
pub fn build_check_request(
  pr_url: &str,
  user: &str,
  updated_at: DateTime<Utc>,
  include_events: bool,
) -> Result<CheckRequest> {
  if pr_url.is_empty() {
    return Err(TurnError::InvalidArgument("PR URL cannot be empty".to_string()));
  }
  if user.is_empty() {
    return Err(TurnError::InvalidArgument("user cannot be empty".to_string()));
  }
  if updated_at == DateTime::<Utc>::default() {
    return Err(TurnError::InvalidArgument(
      "updated_at timestamp cannot be zero".to_string(),
    ));
  }

  Ok(CheckRequest {
    url: pr_url.to_string(),
    updated_at,
    user: user.to_string(),
    include_events,
  })
}
