//! Fixed-window rate limiting for authentication endpoints.
//!
//! Windows are floor-aligned to the Unix epoch, so every node computes
//! the same window boundaries for the same instant without coordination.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sentra_core::Clock;
use sentra_core::error::SentraResult;
use sentra_core::models::rate_limit::{CounterWindow, RateLimitDecision};
use sentra_core::repository::RateLimitRepository;
use tracing::warn;

/// A rate-limited action with its policy baked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitAction {
    /// Login attempts per client IP: 5 per 15 minutes.
    LoginByIp,
    /// Password reset requests per email: 3 per hour.
    PasswordResetByEmail,
}

impl RateLimitAction {
    pub fn name(&self) -> &'static str {
        match self {
            RateLimitAction::LoginByIp => "login_ip",
            RateLimitAction::PasswordResetByEmail => "password_reset_email",
        }
    }

    pub fn max_attempts(&self) -> u32 {
        match self {
            RateLimitAction::LoginByIp => 5,
            RateLimitAction::PasswordResetByEmail => 3,
        }
    }

    pub fn window(&self) -> Duration {
        match self {
            RateLimitAction::LoginByIp => Duration::minutes(15),
            RateLimitAction::PasswordResetByEmail => Duration::hours(1),
        }
    }

    /// Canonical form of the identity: emails are case-insensitive, IPs
    /// are kept as given.
    pub fn normalize(&self, identity: &str) -> String {
        match self {
            RateLimitAction::LoginByIp => identity.trim().to_string(),
            RateLimitAction::PasswordResetByEmail => identity.trim().to_lowercase(),
        }
    }
}

/// Floor-align an instant to the start of its fixed window.
pub fn window_start(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    let window_secs = window.num_seconds().max(1);
    let ts = now.timestamp();
    let aligned = ts - ts.rem_euclid(window_secs);
    DateTime::from_timestamp(aligned, 0).unwrap_or(now)
}

/// Check-then-increment rate limiting over a counter store.
///
/// `check` and `increment` are separate so callers can count only the
/// attempts they choose to (e.g. failed logins but not successful ones).
pub struct RateLimitService<L: RateLimitRepository> {
    repo: L,
    clock: Arc<dyn Clock>,
}

impl<L: RateLimitRepository> RateLimitService<L> {
    pub fn new(repo: L, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    fn window_for(&self, action: RateLimitAction, identity: &str) -> CounterWindow {
        let now = self.clock.now();
        let start = window_start(now, action.window());
        CounterWindow {
            action: action.name().to_string(),
            identity: action.normalize(identity),
            max_attempts: action.max_attempts(),
            window_start: start,
            window_end: start + action.window(),
            kind: "fixed".to_string(),
        }
    }

    /// Admission decision for the current window.
    ///
    /// Fails open: if the counter store is unreachable, the attempt is
    /// allowed with full quota reported, and the failure is logged.
    pub async fn check(&self, action: RateLimitAction, identity: &str) -> RateLimitDecision {
        let window = self.window_for(action, identity);
        match self.repo.fetch_or_init(window.clone()).await {
            Ok(counter) => RateLimitDecision {
                allowed: counter.count < counter.max_attempts,
                remaining: counter.max_attempts.saturating_sub(counter.count),
                reset_at: counter.window_end,
            },
            Err(err) => {
                warn!(
                    action = action.name(),
                    error = %err,
                    "rate limit check failed, failing open"
                );
                RateLimitDecision {
                    allowed: true,
                    remaining: action.max_attempts(),
                    reset_at: self.clock.now() + action.window(),
                }
            }
        }
    }

    /// Record one attempt in the current window.
    pub async fn increment(&self, action: RateLimitAction, identity: &str) -> SentraResult<()> {
        self.repo.increment(self.window_for(action, identity)).await
    }

    /// Clear all counters for the pair, e.g. after a successful password
    /// reset. Returns how many counters were removed.
    pub async fn reset(&self, action: RateLimitAction, identity: &str) -> SentraResult<u64> {
        self.repo
            .reset(action.name(), &action.normalize(identity))
            .await
    }
}
