//! SurrealDB repository implementations.

mod rate_limit;
mod refresh_token;
mod session;
mod user;

pub use rate_limit::SurrealRateLimitRepository;
pub use refresh_token::SurrealRefreshTokenRepository;
pub use session::SurrealSessionRepository;
pub use user::SurrealUserRepository;
