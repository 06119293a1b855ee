//! Fixed-window rate limit counter model.
//!
//! One live counter per (action, normalized identity, window). A window
//! boundary produces a fresh row; counters are never reset in place, and
//! `count` is monotonically non-decreasing within a window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitCounter {
    pub action: String,
    pub identity: String,
    pub count: u32,
    pub max_attempts: u32,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    /// Window scheme tag; currently always "fixed".
    pub kind: String,
}

/// Key + policy for a counter upsert. `check` and `increment` build this
/// from the same clock instant so both target the same row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterWindow {
    pub action: String,
    pub identity: String,
    pub max_attempts: u32,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub kind: String,
}

/// Admission decision handed to the HTTP layer (rate-limit headers and
/// a 429 on `allowed == false`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}
