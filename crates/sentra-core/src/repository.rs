//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Lookups return `Ok(None)` for
//! absent rows; callers decide how absence is classified. Correctness
//! under concurrency relies on the store providing atomic single-row
//! updates — there is no in-process locking anywhere in this system.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::SentraResult;
use crate::models::{
    rate_limit::{CounterWindow, RateLimitCounter},
    refresh_token::{CreateRefreshToken, RefreshToken},
    session::{CreateSession, Session},
    user::{CreateUser, UpdateUser, User},
};

pub trait UserRepository: Send + Sync {
    /// Role is forced to `user` and the verified flag to false; neither
    /// is derived from input.
    fn create(&self, input: CreateUser) -> impl Future<Output = SentraResult<User>> + Send;
    fn find_by_id(&self, id: Uuid) -> impl Future<Output = SentraResult<Option<User>>> + Send;
    fn find_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = SentraResult<Option<User>>> + Send;
    fn find_by_verification_token(
        &self,
        token: &str,
    ) -> impl Future<Output = SentraResult<Option<User>>> + Send;
    fn find_by_reset_token(
        &self,
        token: &str,
    ) -> impl Future<Output = SentraResult<Option<User>>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateUser,
    ) -> impl Future<Output = SentraResult<User>> + Send;
}

pub trait RefreshTokenRepository: Send + Sync {
    fn create(
        &self,
        input: CreateRefreshToken,
    ) -> impl Future<Output = SentraResult<RefreshToken>> + Send;
    /// Returns the row whatever its state; validity checks are the
    /// caller's job.
    fn find(
        &self,
        token: &str,
    ) -> impl Future<Output = SentraResult<Option<RefreshToken>>> + Send;
    /// Idempotent: returns false for an already-revoked or unknown token.
    fn revoke(&self, token: &str) -> impl Future<Output = SentraResult<bool>> + Send;
    /// Flips only non-revoked rows; returns how many were flipped.
    fn revoke_all_for_user(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = SentraResult<u64>> + Send;
    /// Non-revoked, non-expired tokens for a user.
    fn find_active_for_user(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = SentraResult<Vec<RefreshToken>>> + Send;
    /// Physically deletes expired rows, revoked or not. Runs out-of-band;
    /// refresh validation never relies on it.
    fn sweep_expired(&self) -> impl Future<Output = SentraResult<u64>> + Send;
}

pub trait SessionRepository: Send + Sync {
    fn create(&self, input: CreateSession) -> impl Future<Output = SentraResult<Session>> + Send;
    /// Only returns sessions that are active and unexpired as of `now`.
    /// Expiry is judged against the caller's clock, not the store's.
    fn find_by_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> impl Future<Output = SentraResult<Option<Session>>> + Send;
    /// Strictly `is_active && expires_at > now`, newest activity first.
    fn list_active(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> impl Future<Output = SentraResult<Vec<Session>>> + Send;
    /// Bump `last_activity` for the active session holding this token.
    fn touch(&self, token: &str) -> impl Future<Output = SentraResult<()>> + Send;
    /// Ownership-enforced revoke. A session that exists but belongs to a
    /// different user is reported as not found.
    fn revoke(
        &self,
        session_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = SentraResult<()>> + Send;
    fn revoke_by_token(&self, token: &str) -> impl Future<Output = SentraResult<()>> + Send;
    /// No current token → revoke every active session for the user. With
    /// one, exclude exactly that session; the comparison tolerates case
    /// and surrounding whitespace in the token string.
    fn revoke_all_except_current(
        &self,
        user_id: Uuid,
        current_token: Option<&str>,
    ) -> impl Future<Output = SentraResult<u64>> + Send;
    fn sweep_expired(&self) -> impl Future<Output = SentraResult<u64>> + Send;
}

pub trait RateLimitRepository: Send + Sync {
    /// Materialize a zero-count counter for the window if absent and
    /// return the current row, so `remaining` is well-defined before the
    /// first increment.
    fn fetch_or_init(
        &self,
        window: CounterWindow,
    ) -> impl Future<Output = SentraResult<RateLimitCounter>> + Send;
    /// Single atomic upsert-with-increment. Never a read-modify-write
    /// pair: concurrent attempts from one identity must all be counted.
    fn increment(&self, window: CounterWindow) -> impl Future<Output = SentraResult<()>> + Send;
    /// Deletes all counters for the pair across windows; returns how
    /// many rows were removed.
    fn reset(
        &self,
        action: &str,
        identity: &str,
    ) -> impl Future<Output = SentraResult<u64>> + Send;
    /// Removes counters whose window has ended.
    fn sweep_expired(&self) -> impl Future<Output = SentraResult<u64>> + Send;
}
