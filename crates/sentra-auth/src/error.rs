//! Authentication error types.

use sentra_core::error::SentraError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Covers absent user, OAuth-only account, and password mismatch —
    /// deliberately indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Covers every token verification failure class. The internal kind
    /// is logged, never surfaced.
    #[error("invalid token")]
    InvalidToken,

    #[error("User with this email already exists")]
    EmailTaken,

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for SentraError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials | AuthError::InvalidToken => SentraError::Unauthorized {
                reason: err.to_string(),
            },
            AuthError::EmailTaken => SentraError::Conflict {
                message: err.to_string(),
            },
            AuthError::Crypto(msg) => SentraError::Crypto(msg),
        }
    }
}
