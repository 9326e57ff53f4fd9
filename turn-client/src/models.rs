//! # Wire Models
//!
//! Request and response shapes for the Turn `/v1/validate` endpoint and the
//! GitHub identity lookup.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Decode an explicit `null` the same way as a missing field
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Default + Deserialize<'de>,
{
  Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Body of `POST /v1/validate`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRequest {
  pub url: String,
  pub updated_at: DateTime<Utc>,
  pub user: String,
  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  pub include_events: bool,
}

/// Decoded answer from the Turn service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResponse {
  #[serde(default, deserialize_with = "null_default")]
  pub analysis: Analysis,
  /// Timeline events, only present when the request asked for them
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub events: Option<Vec<Event>>,
  /// When the server generated this answer
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub timestamp: Option<DateTime<Utc>>,
  /// Build identifier of the server
  #[serde(default, deserialize_with = "null_default")]
  pub commit: String,
}

impl CheckResponse {
  /// Whether anyone has to act before the PR can progress
  pub fn is_blocked(&self) -> bool {
    !self.analysis.next_action.is_empty()
  }

  /// The action assigned to `user`, if any
  pub fn action_for(&self, user: &str) -> Option<&Action> {
    self.analysis.next_action.get(user)
  }

  /// Whether `user` specifically has something to do
  pub fn is_blocked_on(&self, user: &str) -> bool {
    self.action_for(user).is_some()
  }

  /// Users whose action gates merge progress, in sorted order
  pub fn critical_users(&self) -> impl Iterator<Item = &str> {
    self
      .analysis
      .next_action
      .iter()
      .filter(|(_, action)| action.critical)
      .map(|(user, _)| user.as_str())
  }
}

/// Server-side assessment of the pull request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Analysis {
  /// Blocking actions keyed by username; empty means unblocked
  #[serde(deserialize_with = "null_default")]
  pub next_action: BTreeMap<String, Action>,
  #[serde(deserialize_with = "null_default")]
  pub last_activity: LastActivity,
  #[serde(deserialize_with = "null_default")]
  pub checks: Checks,
  pub unresolved_comments: u32,
  #[serde(deserialize_with = "null_default", skip_serializing_if = "PrSize::is_unknown")]
  pub size: PrSize,
  pub draft: bool,
  pub ready_to_merge: bool,
  pub merge_conflict: bool,
  pub approved: bool,
  #[serde(deserialize_with = "null_default")]
  pub tags: Vec<String>,
  /// Cumulative seconds spent in each workflow state
  #[serde(skip_serializing_if = "Option::is_none")]
  pub state_durations: Option<BTreeMap<String, i64>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub workflow_state: Option<String>,
}

/// Something a user has to do on the pull request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Action {
  /// Machine-readable action name, e.g. `REVIEW`
  pub kind: String,
  /// Gates merge progress when set; advisory otherwise
  pub critical: bool,
  pub reason: String,
  pub ready_to_notify: bool,
}

/// The most recent thing that happened on the pull request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LastActivity {
  pub kind: String,
  pub actor: String,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub timestamp: Option<DateTime<Utc>>,
}

/// CI check counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Checks {
  pub total: u32,
  pub failing: u32,
  pub waiting: u32,
  pub pending: u32,
  pub passing: u32,
  pub ignored: u32,
}

/// Size bucket assigned by the server, ordered smallest to largest.
///
/// [`PrSize::Unknown`] sorts below every real bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrSize {
  Xxs,
  Xs,
  S,
  M,
  L,
  Xl,
  Xxl,
  Insane,
  /// Missing or not a bucket this client knows
  #[default]
  #[serde(other)]
  Unknown,
}

impl PrSize {
  pub const fn is_unknown(&self) -> bool {
    matches!(self, Self::Unknown)
  }

  const fn rank(self) -> u8 {
    match self {
      Self::Unknown => 0,
      Self::Xxs => 1,
      Self::Xs => 2,
      Self::S => 3,
      Self::M => 4,
      Self::L => 5,
      Self::Xl => 6,
      Self::Xxl => 7,
      Self::Insane => 8,
    }
  }
}

impl Ord for PrSize {
  fn cmp(&self, other: &Self) -> Ordering {
    self.rank().cmp(&other.rank())
  }
}

impl PartialOrd for PrSize {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

/// One entry of the pull request timeline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Event {
  pub kind: String,
  pub actor: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub timestamp: Option<DateTime<Utc>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub body: Option<String>,
}

/// Represents a GitHub user
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubUser {
  #[serde(default)]
  pub login: String,
  pub id: Option<u64>,
  pub name: Option<String>,
}
