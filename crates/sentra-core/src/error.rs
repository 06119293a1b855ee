//! Error types for the sentra system.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SentraError {
    /// Bad credentials or a bad/expired/revoked token. Messages are kept
    /// uniform per failure class to avoid account enumeration.
    #[error("Unauthorized: {reason}")]
    Unauthorized { reason: String },

    #[error("{message}")]
    Conflict { message: String },

    /// Also returned when an entity exists but belongs to someone else;
    /// the two cases are indistinguishable to the caller.
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("{message}")]
    BadRequest { message: String },

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Email delivery failed: {0}")]
    Email(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type SentraResult<T> = Result<T, SentraError>;
