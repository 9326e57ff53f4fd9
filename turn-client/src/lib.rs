//! # Turn API Client
//!
//! Asks the Turn review-state service whether a pull request is blocked on a
//! collaborator. Requests go through a retrying transport with capped
//! exponential backoff, responses are read with a hard size limit, and every
//! third-party string is sanitized before it reaches the log.

pub mod client;
pub mod consts;
pub mod context;
pub mod endpoints;
pub mod error;
pub mod models;
pub mod response;
pub mod retry;
pub mod sanitize;

// Re-export the client
pub use client::{TurnClient, TurnClientBuilder};
pub use consts::DEFAULT_BACKEND;
pub use context::{Cancellation, Interrupter, RequestContext};
pub use endpoints::validate::build_check_request;
pub use error::{AttemptFailure, Result, TurnError};
// Re-export models
pub use models::{Action, Analysis, CheckRequest, CheckResponse, Checks, Event, GitHubUser, LastActivity, PrSize};
pub use retry::RetryPolicy;
pub use sanitize::sanitize_for_log;
