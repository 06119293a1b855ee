//! Domain models for sentra.
//!
//! These are the core types shared across all crates.

pub mod rate_limit;
pub mod refresh_token;
pub mod session;
pub mod user;
