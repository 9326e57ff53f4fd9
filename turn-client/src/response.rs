//! # Response Decoding
//!
//! Size-bounded body reads and the status/JSON interpretation shared by every
//! endpoint.

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{Result, TurnError};
use crate::sanitize::truncate_error_body;

/// Read at most `limit` bytes of `response`'s body.
///
/// Bytes past the limit are never buffered; the body is silently cut rather
/// than treated as an error, whatever the declared content length says.
pub(crate) async fn read_capped(mut response: Response, limit: usize) -> Result<Vec<u8>, reqwest::Error> {
  let mut body = Vec::new();
  while let Some(chunk) = response.chunk().await? {
    let remaining = limit - body.len();
    if chunk.len() >= remaining {
      body.extend_from_slice(&chunk[..remaining]);
      break;
    }
    body.extend_from_slice(&chunk);
  }
  Ok(body)
}

/// Interpret a final response: 200 bodies decode into `T`, anything else
/// becomes [`TurnError::RemoteRejected`] carrying a bounded excerpt.
pub(crate) fn decode_json<T: DeserializeOwned>(operation: &'static str, status: StatusCode, body: &[u8]) -> Result<T> {
  if status != StatusCode::OK {
    let excerpt = truncate_error_body(&String::from_utf8_lossy(body));
    return Err(TurnError::RemoteRejected {
      operation,
      status: status.as_u16(),
      body: excerpt,
    });
  }

  serde_json::from_slice(body).map_err(|e| {
    debug!(status = status.as_u16(), size = body.len(), "failed to decode response body");
    TurnError::MalformedResponse {
      operation,
      reason: format!("decode response ({} bytes)", body.len()),
      source: Some(e),
    }
  })
}
