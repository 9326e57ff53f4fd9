//! Test utilities shared across the turn workspace
//!
//! This crate provides common testing infrastructure including:
//! - XDG directory mocking ([`EnvTestGuard`])
//! - GitHub token variable isolation ([`TokenEnvGuard`])
//! - In-memory tracing output for assertions ([`LogCapture`])
//!
//! Environment guards mutate process-wide state. Tests that use them should
//! hold [`env_lock`] for their whole duration.
//!
//! The clippy dead_code lint is disabled for this crate because test utilities
//! may not be used by all tests, and the compiler cannot detect usage across
//! crate boundaries in development dependencies.

#![allow(dead_code)]

pub mod capture;
pub mod env;
pub mod token;

// Re-export commonly used items
pub use capture::LogCapture;
pub use env::{EnvTestGuard, env_lock};
pub use token::TokenEnvGuard;
