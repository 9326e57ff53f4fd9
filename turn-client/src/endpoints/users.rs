use reqwest::header::{ACCEPT, USER_AGENT};
use tracing::{debug, instrument};

use crate::client::TurnClient;
use crate::consts::{ACCEPT_GITHUB, USER_AGENT as USER_AGENT_VALUE};
use crate::context::RequestContext;
use crate::error::{Result, TurnError};
use crate::models::GitHubUser;
use crate::response::decode_json;
use crate::sanitize::sanitize_for_log;

const OPERATION: &str = "current user lookup";

impl TurnClient {
  /// Resolve the login of the GitHub user owning the configured auth token
  pub async fn current_user(&self, ctx: &RequestContext) -> Result<String> {
    self.scoped(self.current_user_inner(ctx)).await
  }

  #[instrument(skip_all, level = "debug")]
  async fn current_user_inner(&self, ctx: &RequestContext) -> Result<String> {
    let Some(token) = self.auth_token.as_deref() else {
      return Err(TurnError::InvalidArgument("no auth token set".to_string()));
    };

    let url = format!("{}/user", self.github_api_url);
    debug!("fetching current user from {}", sanitize_for_log(&url));

    let (status, bytes) = self
      .execute(OPERATION, ctx, || {
        self
          .http
          .get(&url)
          .header(ACCEPT, ACCEPT_GITHUB)
          .header(USER_AGENT, USER_AGENT_VALUE)
          .bearer_auth(token)
      })
      .await?;

    let user: GitHubUser = decode_json(OPERATION, status, &bytes)?;
    if user.login.is_empty() {
      return Err(TurnError::MalformedResponse {
        operation: OPERATION,
        reason: "empty username in GitHub response".to_string(),
        source: None,
      });
    }

    debug!("authenticated as {}", sanitize_for_log(&user.login));
    Ok(user.login)
  }
}
