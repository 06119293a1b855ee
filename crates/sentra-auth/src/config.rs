//! Authentication configuration.

/// Configuration for the token codec and authentication service.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC secret for signing access tokens.
    pub access_token_secret: String,
    /// HMAC secret for signing refresh tokens. Independent of the access
    /// secret — each token kind must be rejected under the other key.
    pub refresh_token_secret: String,
    /// Token issuer (`iss` claim).
    pub issuer: String,
    /// Access token lifetime in seconds (default: 900 = 15 minutes).
    pub access_token_lifetime_secs: u64,
    /// Refresh token lifetime in seconds (default: 604_800 = 7 days).
    pub refresh_token_lifetime_secs: u64,
    /// Email verification token lifetime in seconds (default: 86_400 = 24 hours).
    pub verification_token_lifetime_secs: u64,
    /// Password reset token lifetime in seconds (default: 3_600 = 1 hour).
    pub reset_token_lifetime_secs: u64,
    /// Minimum password length for policy enforcement.
    pub min_password_length: usize,
    /// Optional pepper prepended to passwords before Argon2id hashing.
    pub pepper: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token_secret: String::new(),
            refresh_token_secret: String::new(),
            issuer: "sentra".into(),
            access_token_lifetime_secs: 900,
            refresh_token_lifetime_secs: 604_800,
            verification_token_lifetime_secs: 86_400,
            reset_token_lifetime_secs: 3_600,
            min_password_length: 8,
            pepper: None,
        }
    }
}
