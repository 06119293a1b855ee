//! Wall-clock abstraction.
//!
//! All expiry and rate-limit window computation derives from a single
//! injected clock, so an admission check and the increment that follows
//! it always agree on window boundaries.

use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// System clock backed by [`Utc::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
