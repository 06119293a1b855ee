//! Sentra Server — application entry point.
//!
//! Connects to SurrealDB, runs migrations, and drives the out-of-band
//! expiry sweeper for refresh tokens, sessions, and rate limit
//! counters. Token validation never depends on the sweeper having run;
//! it only reclaims storage.

use std::time::Duration;

use sentra_core::repository::{RateLimitRepository, RefreshTokenRepository, SessionRepository};
use sentra_db::repository::{
    SurrealRateLimitRepository, SurrealRefreshTokenRepository, SurrealSessionRepository,
};
use sentra_db::DbConfig;
use tracing_subscriber::EnvFilter;

const SWEEP_INTERVAL_SECS: u64 = 300;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("sentra=info".parse().unwrap()),
        )
        .json()
        .init();

    tracing::info!("Starting Sentra server...");

    let config = DbConfig::from_env();
    let manager = match config.connect().await {
        Ok(manager) => manager,
        Err(err) => {
            tracing::error!(error = %err, "failed to connect to SurrealDB");
            std::process::exit(1);
        }
    };

    if let Err(err) = sentra_db::run_migrations(manager.client()).await {
        tracing::error!(error = %err, "migrations failed");
        std::process::exit(1);
    }

    let db = manager.client().clone();
    let refresh_tokens = SurrealRefreshTokenRepository::new(db.clone());
    let sessions = SurrealSessionRepository::new(db.clone());
    let rate_limits = SurrealRateLimitRepository::new(db);

    let mut interval = tokio::time::interval(Duration::from_secs(SWEEP_INTERVAL_SECS));

    loop {
        tokio::select! {
            _ = interval.tick() => {
                sweep(&refresh_tokens, &sessions, &rate_limits).await;
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    tracing::info!("Sentra server stopped.");
}

/// One sweep pass over the three expirable stores. Failures are logged
/// and retried on the next tick.
async fn sweep<R, S, L>(refresh_tokens: &R, sessions: &S, rate_limits: &L)
where
    R: RefreshTokenRepository,
    S: SessionRepository,
    L: RateLimitRepository,
{
    match refresh_tokens.sweep_expired().await {
        Ok(removed) if removed > 0 => {
            tracing::info!(removed, "swept expired refresh tokens");
        }
        Ok(_) => {}
        Err(err) => tracing::warn!(error = %err, "refresh token sweep failed"),
    }

    match sessions.sweep_expired().await {
        Ok(removed) if removed > 0 => {
            tracing::info!(removed, "swept expired sessions");
        }
        Ok(_) => {}
        Err(err) => tracing::warn!(error = %err, "session sweep failed"),
    }

    match rate_limits.sweep_expired().await {
        Ok(removed) if removed > 0 => {
            tracing::info!(removed, "swept closed rate limit windows");
        }
        Ok(_) => {}
        Err(err) => tracing::warn!(error = %err, "rate limit sweep failed"),
    }
}
