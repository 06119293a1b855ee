//! Signed token codec: JWT issuance and verification for access and
//! refresh tokens, plus opaque one-time token generation.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sentra_core::models::user::Role;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;

/// JWT claims embedded in every token, access and refresh alike.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject — user ID (UUID string).
    pub sub: String,
    /// User email at issuance time.
    pub email: String,
    /// User role at issuance time.
    pub role: String,
    /// Issuer.
    pub iss: String,
    /// Issued-at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
    /// Unique token ID (UUID string). Keeps two tokens issued in the
    /// same second distinguishable.
    pub jti: String,
}

/// Why verification rejected a token. Logged internally, never surfaced
/// to callers as-is.
#[derive(Debug)]
pub enum TokenError {
    Expired,
    WrongIssuer,
    MissingClaim(&'static str),
    Malformed(String),
}

impl TokenError {
    /// Short tag for structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            TokenError::Expired => "expired",
            TokenError::WrongIssuer => "wrong_issuer",
            TokenError::MissingClaim(_) => "missing_claim",
            TokenError::Malformed(_) => "malformed",
        }
    }
}

/// Issue a signed HS256 access token.
pub fn issue_access_token(
    user_id: Uuid,
    email: &str,
    role: Role,
    now: DateTime<Utc>,
    config: &AuthConfig,
) -> Result<String, AuthError> {
    issue(
        user_id,
        email,
        role,
        now,
        config.access_token_lifetime_secs,
        &config.access_token_secret,
        &config.issuer,
    )
}

/// Issue a signed HS256 refresh token. Signed with a secret independent
/// of the access secret, so each token kind is rejected under the other
/// key.
pub fn issue_refresh_token(
    user_id: Uuid,
    email: &str,
    role: Role,
    now: DateTime<Utc>,
    config: &AuthConfig,
) -> Result<String, AuthError> {
    issue(
        user_id,
        email,
        role,
        now,
        config.refresh_token_lifetime_secs,
        &config.refresh_token_secret,
        &config.issuer,
    )
}

fn issue(
    user_id: Uuid,
    email: &str,
    role: Role,
    now: DateTime<Utc>,
    lifetime_secs: u64,
    secret: &str,
    issuer: &str,
) -> Result<String, AuthError> {
    let iat = now.timestamp();
    let claims = TokenClaims {
        sub: user_id.to_string(),
        email: email.to_string(),
        role: role.as_str().to_string(),
        iss: issuer.to_string(),
        iat,
        exp: iat + lifetime_secs as i64,
        jti: Uuid::new_v4().to_string(),
    };

    let key = EncodingKey::from_secret(secret.as_bytes());
    let header = Header::new(Algorithm::HS256);
    jsonwebtoken::encode(&header, &claims, &key)
        .map_err(|e| AuthError::Crypto(format!("JWT encode: {e}")))
}

/// Verify an access token: signature, expiry, issuer, claim presence.
pub fn verify_access_token(token: &str, config: &AuthConfig) -> Result<TokenClaims, TokenError> {
    verify(token, &config.access_token_secret, &config.issuer)
}

/// Verify a refresh token against the refresh signing secret.
pub fn verify_refresh_token(token: &str, config: &AuthConfig) -> Result<TokenClaims, TokenError> {
    verify(token, &config.refresh_token_secret, &config.issuer)
}

fn verify(token: &str, secret: &str, issuer: &str) -> Result<TokenClaims, TokenError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[issuer]);
    validation.set_required_spec_claims(&["sub", "exp", "iat", "iss"]);

    let claims = jsonwebtoken::decode::<TokenClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
            jsonwebtoken::errors::ErrorKind::InvalidIssuer => TokenError::WrongIssuer,
            _ => TokenError::Malformed(e.to_string()),
        })?;

    // A valid signature is not enough: a token carrying empty identity
    // claims cannot be mapped back to a user.
    if claims.sub.is_empty() {
        return Err(TokenError::MissingClaim("sub"));
    }
    if claims.email.is_empty() {
        return Err(TokenError::MissingClaim("email"));
    }
    if claims.role.is_empty() {
        return Err(TokenError::MissingClaim("role"));
    }

    Ok(claims)
}

/// Decode a token's claims without verifying signature or expiry.
///
/// For diagnostics only (logging the subject of a rejected token).
/// Never trust the output for authentication decisions.
pub fn decode_unsafe(token: &str) -> Option<TokenClaims> {
    let key = DecodingKey::from_secret(&[]);

    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    jsonwebtoken::decode::<TokenClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .ok()
}

/// Generate a cryptographically random opaque one-time token
/// (32 bytes → base64url-encoded, no padding). Used for email
/// verification and password reset links.
pub fn generate_one_time_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rand::Rng::random(&mut rng);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AuthConfig {
        AuthConfig {
            access_token_secret: "access-secret-for-tests".into(),
            refresh_token_secret: "refresh-secret-for-tests".into(),
            issuer: "sentra-test".into(),
            ..AuthConfig::default()
        }
    }

    #[test]
    fn access_token_roundtrip() {
        let config = test_config();
        let user_id = Uuid::new_v4();
        let now = Utc::now();

        let token =
            issue_access_token(user_id, "a@example.com", Role::User, now, &config).unwrap();
        let claims = verify_access_token(&token, &config).unwrap();

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email, "a@example.com");
        assert_eq!(claims.role, "user");
        assert_eq!(claims.iss, "sentra-test");
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn refresh_token_roundtrip() {
        let config = test_config();
        let user_id = Uuid::new_v4();
        let now = Utc::now();

        let token =
            issue_refresh_token(user_id, "a@example.com", Role::Admin, now, &config).unwrap();
        let claims = verify_refresh_token(&token, &config).unwrap();

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.role, "admin");
        assert_eq!(claims.exp - claims.iat, 604_800);
    }

    #[test]
    fn token_kinds_reject_each_other() {
        let config = test_config();
        let user_id = Uuid::new_v4();
        let now = Utc::now();

        let access =
            issue_access_token(user_id, "a@example.com", Role::User, now, &config).unwrap();
        let refresh =
            issue_refresh_token(user_id, "a@example.com", Role::User, now, &config).unwrap();

        assert!(matches!(
            verify_refresh_token(&access, &config),
            Err(TokenError::Malformed(_))
        ));
        assert!(matches!(
            verify_access_token(&refresh, &config),
            Err(TokenError::Malformed(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = test_config();
        let past = Utc::now() - chrono::Duration::hours(2);

        let token =
            issue_access_token(Uuid::new_v4(), "a@example.com", Role::User, past, &config)
                .unwrap();

        assert!(matches!(
            verify_access_token(&token, &config),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn wrong_issuer_is_rejected() {
        let mut other = test_config();
        other.issuer = "someone-else".into();
        let config = test_config();

        let token = issue_access_token(
            Uuid::new_v4(),
            "a@example.com",
            Role::User,
            Utc::now(),
            &other,
        )
        .unwrap();

        assert!(matches!(
            verify_access_token(&token, &config),
            Err(TokenError::WrongIssuer)
        ));
    }

    #[test]
    fn empty_sub_is_rejected() {
        let config = test_config();
        let claims = TokenClaims {
            sub: String::new(),
            email: "a@example.com".into(),
            role: "user".into(),
            iss: config.issuer.clone(),
            iat: Utc::now().timestamp(),
            exp: Utc::now().timestamp() + 900,
            jti: Uuid::new_v4().to_string(),
        };
        let key = EncodingKey::from_secret(config.access_token_secret.as_bytes());
        let token =
            jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &key).unwrap();

        assert!(matches!(
            verify_access_token(&token, &config),
            Err(TokenError::MissingClaim("sub"))
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        let config = test_config();
        assert!(matches!(
            verify_access_token("not.a.jwt", &config),
            Err(TokenError::Malformed(_))
        ));
    }

    #[test]
    fn decode_unsafe_reads_expired_and_foreign_tokens() {
        let config = test_config();
        let past = Utc::now() - chrono::Duration::hours(2);
        let user_id = Uuid::new_v4();

        let token =
            issue_access_token(user_id, "a@example.com", Role::User, past, &config).unwrap();

        let claims = decode_unsafe(&token).unwrap();
        assert_eq!(claims.sub, user_id.to_string());

        assert!(decode_unsafe("complete garbage").is_none());
    }

    #[test]
    fn tokens_issued_in_the_same_second_differ() {
        let config = test_config();
        let user_id = Uuid::new_v4();
        let now = Utc::now();

        let t1 = issue_refresh_token(user_id, "a@example.com", Role::User, now, &config).unwrap();
        let t2 = issue_refresh_token(user_id, "a@example.com", Role::User, now, &config).unwrap();
        assert_ne!(t1, t2);

        let c1 = verify_refresh_token(&t1, &config).unwrap();
        let c2 = verify_refresh_token(&t2, &config).unwrap();
        assert_ne!(c1.jti, c2.jti);
    }

    #[test]
    fn one_time_token_is_url_safe() {
        let token = generate_one_time_token();
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
        // 32 bytes → 43 base64url chars.
        assert_eq!(token.len(), 43);
    }

    #[test]
    fn one_time_tokens_are_unique() {
        assert_ne!(generate_one_time_token(), generate_one_time_token());
    }
}
