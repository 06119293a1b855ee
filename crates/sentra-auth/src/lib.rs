//! Sentra Auth — password hashing, the signed-token codec, fixed-window
//! rate limiting, and the authentication orchestrator.

pub mod config;
pub mod error;
pub mod password;
pub mod rate_limit;
pub mod service;
pub mod token;
pub mod validate;

pub use config::AuthConfig;
pub use error::AuthError;
pub use rate_limit::{RateLimitAction, RateLimitService};
pub use service::{AuthOutput, AuthService, AuthTokens, LoginInput, RefreshOutput, RegisterInput};
pub use token::TokenClaims;
