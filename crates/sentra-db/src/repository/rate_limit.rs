//! SurrealDB implementation of [`RateLimitRepository`].
//!
//! Counters live at a deterministic record id derived from
//! `(action, identity, window_start)`, so concurrent writers from any
//! node collide on the same row and `count += 1` stays atomic inside
//! a single UPSERT statement.

use chrono::{DateTime, Utc};
use sentra_core::error::SentraResult;
use sentra_core::models::rate_limit::{CounterWindow, RateLimitCounter};
use sentra_core::repository::RateLimitRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct RateLimitRow {
    action: String,
    identity: String,
    count: u32,
    max_attempts: u32,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    kind: String,
}

impl RateLimitRow {
    fn into_counter(self) -> RateLimitCounter {
        RateLimitCounter {
            action: self.action,
            identity: self.identity,
            count: self.count,
            max_attempts: self.max_attempts,
            window_start: self.window_start,
            window_end: self.window_end,
            kind: self.kind,
        }
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// Deterministic record id for a counter row.
fn counter_key(window: &CounterWindow) -> String {
    format!(
        "{}|{}|{}",
        window.action,
        window.identity,
        window.window_start.timestamp()
    )
}

/// SurrealDB implementation of the RateLimit repository.
#[derive(Clone)]
pub struct SurrealRateLimitRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRateLimitRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Single-statement counter upsert. `delta = 0` materializes the
    /// zero-count row, `delta = 1` records an attempt.
    async fn upsert(&self, window: CounterWindow, delta: u32) -> SentraResult<RateLimitCounter> {
        let key = counter_key(&window);

        let result = self
            .db
            .query(
                "UPSERT type::record('rate_limit', $key) SET \
                 count += $delta, \
                 action = $action, \
                 identity = $identity, \
                 max_attempts = $max_attempts, \
                 window_start = $window_start, \
                 window_end = $window_end, \
                 kind = $kind",
            )
            .bind(("key", key.clone()))
            .bind(("delta", delta))
            .bind(("action", window.action))
            .bind(("identity", window.identity))
            .bind(("max_attempts", window.max_attempts))
            .bind(("window_start", window.window_start))
            .bind(("window_end", window.window_end))
            .bind(("kind", window.kind))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Decode(e.to_string()))?;

        let rows: Vec<RateLimitRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "rate_limit".into(),
            id: key,
        })?;

        Ok(row.into_counter())
    }
}

impl<C: Connection> RateLimitRepository for SurrealRateLimitRepository<C> {
    async fn fetch_or_init(&self, window: CounterWindow) -> SentraResult<RateLimitCounter> {
        self.upsert(window, 0).await
    }

    async fn increment(&self, window: CounterWindow) -> SentraResult<()> {
        self.upsert(window, 1).await?;
        Ok(())
    }

    async fn reset(&self, action: &str, identity: &str) -> SentraResult<u64> {
        let action = action.to_string();
        let identity = identity.to_string();

        // Count matching counters first, then delete.
        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM rate_limit \
                 WHERE action = $action AND identity = $identity \
                 GROUP ALL",
            )
            .bind(("action", action.clone()))
            .bind(("identity", identity.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        self.db
            .query("DELETE rate_limit WHERE action = $action AND identity = $identity")
            .bind(("action", action))
            .bind(("identity", identity))
            .await
            .map_err(DbError::from)?;

        Ok(total)
    }

    async fn sweep_expired(&self) -> SentraResult<u64> {
        // Count closed windows first, then delete.
        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM rate_limit \
                 WHERE window_end <= time::now() GROUP ALL",
            )
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        self.db
            .query("DELETE rate_limit WHERE window_end <= time::now()")
            .await
            .map_err(DbError::from)?;

        Ok(total)
    }
}
