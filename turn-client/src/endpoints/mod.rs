//! # Turn API Endpoints
//!
//! Endpoint implementations on [`crate::TurnClient`]: PR validation against
//! the Turn backend and the GitHub identity lookup.

pub mod users;
pub mod validate;
