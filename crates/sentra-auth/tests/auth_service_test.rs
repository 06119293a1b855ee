//! Integration tests for the auth service using in-memory SurrealDB.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use sentra_auth::rate_limit::{RateLimitAction, RateLimitService};
use sentra_auth::{AuthConfig, AuthService, LoginInput, RegisterInput, token};
use sentra_core::error::{SentraError, SentraResult};
use sentra_core::mailer::Mailer;
use sentra_core::models::refresh_token::CreateRefreshToken;
use sentra_core::models::user::{CreateUser, UpdateUser};
use sentra_core::repository::{RefreshTokenRepository, UserRepository};
use sentra_core::Clock;
use sentra_db::repository::{
    SurrealRateLimitRepository, SurrealRefreshTokenRepository, SurrealSessionRepository,
    SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

/// Mailer double: records sends, captures the last one-time token, and
/// can be switched into failure mode.
#[derive(Clone, Default)]
struct TestMailer {
    sent: Arc<Mutex<Vec<String>>>,
    fail: Arc<AtomicBool>,
    last_token: Arc<Mutex<Option<String>>>,
}

impl TestMailer {
    fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    fn last_token(&self) -> Option<String> {
        self.last_token.lock().unwrap().clone()
    }

    fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn record(&self, kind: &str, email: &str, token: Option<&str>) -> SentraResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SentraError::Email("smtp unavailable".into()));
        }
        self.sent.lock().unwrap().push(format!("{kind}:{email}"));
        if let Some(token) = token {
            *self.last_token.lock().unwrap() = Some(token.to_string());
        }
        Ok(())
    }
}

impl Mailer for TestMailer {
    async fn send_verification(&self, email: &str, token: &str) -> SentraResult<()> {
        self.record("verification", email, Some(token))
    }

    async fn send_password_reset(&self, email: &str, token: &str) -> SentraResult<()> {
        self.record("password_reset", email, Some(token))
    }

    async fn send_login_notification(
        &self,
        email: &str,
        _device_info: &str,
        _ip_address: Option<&str>,
        _location: Option<&str>,
    ) -> SentraResult<()> {
        self.record("login_notification", email, None)
    }
}

/// Clock double that can be advanced by tests.
struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    fn starting_now() -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(Utc::now()),
        })
    }

    fn advance(&self, delta: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += delta;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

type TestService = AuthService<
    SurrealUserRepository<Db>,
    SurrealRefreshTokenRepository<Db>,
    SurrealSessionRepository<Db>,
    SurrealRateLimitRepository<Db>,
    TestMailer,
>;

struct TestEnv {
    service: TestService,
    users: SurrealUserRepository<Db>,
    refresh_tokens: SurrealRefreshTokenRepository<Db>,
    mailer: TestMailer,
    clock: Arc<FixedClock>,
    config: AuthConfig,
}

fn test_config() -> AuthConfig {
    AuthConfig {
        access_token_secret: "access-secret-for-tests".into(),
        refresh_token_secret: "refresh-secret-for-tests".into(),
        issuer: "sentra-test".into(),
        ..AuthConfig::default()
    }
}

async fn setup() -> TestEnv {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    sentra_db::run_migrations(&db).await.unwrap();

    let mailer = TestMailer::default();
    let clock = FixedClock::starting_now();
    let config = test_config();

    let service = AuthService::new(
        SurrealUserRepository::new(db.clone()),
        SurrealRefreshTokenRepository::new(db.clone()),
        SurrealSessionRepository::new(db.clone()),
        RateLimitService::new(
            SurrealRateLimitRepository::new(db.clone()),
            clock.clone() as Arc<dyn Clock>,
        ),
        mailer.clone(),
        clock.clone() as Arc<dyn Clock>,
        config.clone(),
    );

    TestEnv {
        service,
        users: SurrealUserRepository::new(db.clone()),
        refresh_tokens: SurrealRefreshTokenRepository::new(db.clone()),
        mailer,
        clock,
        config,
    }
}

fn register_input(email: &str, password: &str) -> RegisterInput {
    RegisterInput {
        email: email.into(),
        password: password.into(),
        device_info: Some("Firefox on Linux".into()),
        ip_address: Some("10.0.0.1".into()),
        user_agent: Some("Mozilla/5.0".into()),
        location: None,
    }
}

fn login_input(email: &str, password: &str) -> LoginInput {
    LoginInput {
        email: email.into(),
        password: password.into(),
        device_info: Some("Safari on iPhone".into()),
        ip_address: Some("10.0.0.2".into()),
        user_agent: Some("Mozilla/5.0".into()),
        location: Some("Milan, IT".into()),
    }
}

// ---------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------

#[tokio::test]
async fn register_creates_user_tokens_and_session() {
    let env = setup().await;

    let output = env
        .service
        .register(register_input("Alice@Example.com", "Passw0rd!"))
        .await
        .unwrap();

    // Email is normalized to lowercase.
    assert_eq!(output.user.email, "alice@example.com");
    assert!(!output.user.email_verified);
    assert!(output.user.is_active);

    // Both tokens verify under their own secrets.
    let access = token::verify_access_token(&output.tokens.access_token, &env.config).unwrap();
    let refresh = token::verify_refresh_token(&output.tokens.refresh_token, &env.config).unwrap();
    assert_eq!(access.sub, output.user.id.to_string());
    assert_eq!(refresh.sub, output.user.id.to_string());

    // A device session exists.
    let sessions = env.service.list_sessions(output.user.id).await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].device_info.as_deref(), Some("Firefox on Linux"));

    // The verification email went out.
    assert_eq!(env.mailer.sent(), vec!["verification:alice@example.com"]);
    assert!(env.mailer.last_token().is_some());
}

#[tokio::test]
async fn register_duplicate_email_is_conflict() {
    let env = setup().await;

    env.service
        .register(register_input("alice@example.com", "Passw0rd!"))
        .await
        .unwrap();

    let err = env
        .service
        .register(register_input("ALICE@example.com", "0therPassw0rd"))
        .await
        .unwrap_err();

    match err {
        SentraError::Conflict { message } => {
            assert_eq!(message, "User with this email already exists");
        }
        other => panic!("expected Conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn register_rejects_weak_passwords() {
    let env = setup().await;

    // Too short, no digit, no letter.
    for bad in ["Pw1", "passwordonly", "1234567890"] {
        let err = env
            .service
            .register(register_input("weak@example.com", bad))
            .await
            .unwrap_err();
        assert!(matches!(err, SentraError::BadRequest { .. }), "{bad}: {err:?}");
    }
}

#[tokio::test]
async fn register_rejects_invalid_email() {
    let env = setup().await;

    let err = env
        .service
        .register(register_input("not-an-email", "Passw0rd!"))
        .await
        .unwrap_err();
    assert!(matches!(err, SentraError::BadRequest { .. }));
}

#[tokio::test]
async fn register_survives_email_send_failure() {
    let env = setup().await;
    env.mailer.set_fail(true);

    let output = env
        .service
        .register(register_input("alice@example.com", "Passw0rd!"))
        .await
        .unwrap();

    assert!(env.mailer.sent().is_empty());
    // The account is fully usable.
    let sessions = env.service.list_sessions(output.user.id).await.unwrap();
    assert_eq!(sessions.len(), 1);
}

// ---------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------

#[tokio::test]
async fn login_happy_path() {
    let env = setup().await;
    env.service
        .register(register_input("alice@example.com", "Passw0rd!"))
        .await
        .unwrap();

    let output = env
        .service
        .login(login_input("alice@example.com", "Passw0rd!"))
        .await
        .unwrap();

    token::verify_access_token(&output.tokens.access_token, &env.config).unwrap();

    // Last-login bookkeeping is recorded.
    let user = env
        .users
        .find_by_email("alice@example.com")
        .await
        .unwrap()
        .unwrap();
    assert!(user.last_login_at.is_some());
    assert_eq!(user.last_login_device.as_deref(), Some("Safari on iPhone"));
    assert_eq!(user.last_login_ip.as_deref(), Some("10.0.0.2"));

    // Registration session + login session.
    let sessions = env.service.list_sessions(output.user.id).await.unwrap();
    assert_eq!(sessions.len(), 2);

    let sent = env.mailer.sent();
    assert!(sent.contains(&"login_notification:alice@example.com".to_string()));
}

#[tokio::test]
async fn login_failures_are_uniform() {
    let env = setup().await;
    env.service
        .register(register_input("alice@example.com", "Passw0rd!"))
        .await
        .unwrap();

    // OAuth-only account (no password hash).
    env.users
        .create(CreateUser {
            email: "oauth@example.com".into(),
            password_hash: None,
            verification_token: None,
            verification_expires_at: None,
        })
        .await
        .unwrap();

    let cases = [
        ("alice@example.com", "WrongPassw0rd"),
        ("ghost@example.com", "Passw0rd!"),
        ("oauth@example.com", "Passw0rd!"),
    ];
    for (email, password) in cases {
        let err = env
            .service
            .login(login_input(email, password))
            .await
            .unwrap_err();
        match err {
            SentraError::Unauthorized { reason } => {
                assert_eq!(reason, "invalid credentials", "case {email}");
            }
            other => panic!("expected Unauthorized for {email}, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn login_rejects_inactive_account() {
    let env = setup().await;
    let output = env
        .service
        .register(register_input("alice@example.com", "Passw0rd!"))
        .await
        .unwrap();

    env.users
        .update(
            output.user.id,
            UpdateUser {
                is_active: Some(false),
                ..UpdateUser::default()
            },
        )
        .await
        .unwrap();

    let err = env
        .service
        .login(login_input("alice@example.com", "Passw0rd!"))
        .await
        .unwrap_err();
    match err {
        SentraError::Unauthorized { reason } => assert_eq!(reason, "invalid credentials"),
        other => panic!("expected Unauthorized, got {other:?}"),
    }
}

// ---------------------------------------------------------------------
// Refresh
// ---------------------------------------------------------------------

#[tokio::test]
async fn refresh_issues_new_access_token_only() {
    let env = setup().await;
    let output = env
        .service
        .register(register_input("alice@example.com", "Passw0rd!"))
        .await
        .unwrap();

    let refreshed = env
        .service
        .refresh(&output.tokens.refresh_token)
        .await
        .unwrap();

    let claims = token::verify_access_token(&refreshed.access_token, &env.config).unwrap();
    assert_eq!(claims.sub, output.user.id.to_string());

    // The same refresh token keeps working.
    env.service
        .refresh(&output.tokens.refresh_token)
        .await
        .unwrap();
}

#[tokio::test]
async fn refresh_rejects_garbage_and_wrong_kind() {
    let env = setup().await;
    let output = env
        .service
        .register(register_input("alice@example.com", "Passw0rd!"))
        .await
        .unwrap();

    // Garbage string.
    assert!(matches!(
        env.service.refresh("not-a-token").await.unwrap_err(),
        SentraError::Unauthorized { .. }
    ));

    // An access token is signed under the wrong secret for refresh.
    assert!(matches!(
        env.service
            .refresh(&output.tokens.access_token)
            .await
            .unwrap_err(),
        SentraError::Unauthorized { .. }
    ));
}

#[tokio::test]
async fn refresh_rejects_revoked_token() {
    let env = setup().await;
    let output = env
        .service
        .register(register_input("alice@example.com", "Passw0rd!"))
        .await
        .unwrap();

    env.service.logout(&output.tokens.refresh_token).await.unwrap();

    assert!(matches!(
        env.service
            .refresh(&output.tokens.refresh_token)
            .await
            .unwrap_err(),
        SentraError::Unauthorized { .. }
    ));
}

#[tokio::test]
async fn refresh_rejects_expired_store_record() {
    let env = setup().await;
    let output = env
        .service
        .register(register_input("alice@example.com", "Passw0rd!"))
        .await
        .unwrap();

    // A codec-valid token whose store record has already expired.
    let stale_jwt = token::issue_refresh_token(
        output.user.id,
        "alice@example.com",
        sentra_core::models::user::Role::User,
        env.clock.now(),
        &env.config,
    )
    .unwrap();
    env.refresh_tokens
        .create(CreateRefreshToken {
            user_id: output.user.id,
            token: stale_jwt.clone(),
            expires_at: env.clock.now() - Duration::hours(1),
            device_info: None,
            ip_address: None,
        })
        .await
        .unwrap();

    assert!(matches!(
        env.service.refresh(&stale_jwt).await.unwrap_err(),
        SentraError::Unauthorized { .. }
    ));
}

#[tokio::test]
async fn refresh_rejects_deactivated_user() {
    let env = setup().await;
    let output = env
        .service
        .register(register_input("alice@example.com", "Passw0rd!"))
        .await
        .unwrap();

    env.users
        .update(
            output.user.id,
            UpdateUser {
                is_active: Some(false),
                ..UpdateUser::default()
            },
        )
        .await
        .unwrap();

    assert!(matches!(
        env.service
            .refresh(&output.tokens.refresh_token)
            .await
            .unwrap_err(),
        SentraError::Unauthorized { .. }
    ));
}

#[tokio::test]
async fn logout_is_idempotent() {
    let env = setup().await;
    let output = env
        .service
        .register(register_input("alice@example.com", "Passw0rd!"))
        .await
        .unwrap();

    env.service.logout(&output.tokens.refresh_token).await.unwrap();
    env.service.logout(&output.tokens.refresh_token).await.unwrap();
    env.service.logout("never-existed").await.unwrap();
}

// ---------------------------------------------------------------------
// Password reset
// ---------------------------------------------------------------------

#[tokio::test]
async fn forgot_then_reset_password_flow() {
    let env = setup().await;
    let output = env
        .service
        .register(register_input("alice@example.com", "Passw0rd!"))
        .await
        .unwrap();

    env.service.forgot_password("alice@example.com").await.unwrap();
    let reset_token = env.mailer.last_token().unwrap();

    env.service
        .reset_password(&reset_token, "N3wPassword!")
        .await
        .unwrap();

    // Every refresh token is revoked.
    assert!(matches!(
        env.service
            .refresh(&output.tokens.refresh_token)
            .await
            .unwrap_err(),
        SentraError::Unauthorized { .. }
    ));
    // ...and every session is gone.
    assert!(env.service.list_sessions(output.user.id).await.unwrap().is_empty());

    // Old password no longer works; the new one does.
    assert!(
        env.service
            .login(login_input("alice@example.com", "Passw0rd!"))
            .await
            .is_err()
    );
    env.service
        .login(login_input("alice@example.com", "N3wPassword!"))
        .await
        .unwrap();

    // The reset token is single-use.
    assert!(matches!(
        env.service
            .reset_password(&reset_token, "An0therPass!")
            .await
            .unwrap_err(),
        SentraError::BadRequest { .. }
    ));
}

#[tokio::test]
async fn forgot_password_unknown_email_is_not_found() {
    let env = setup().await;

    assert!(matches!(
        env.service
            .forgot_password("ghost@example.com")
            .await
            .unwrap_err(),
        SentraError::NotFound { .. }
    ));
}

#[tokio::test]
async fn forgot_password_send_failure_rolls_back_token() {
    let env = setup().await;
    env.service
        .register(register_input("alice@example.com", "Passw0rd!"))
        .await
        .unwrap();

    env.mailer.set_fail(true);
    assert!(env.service.forgot_password("alice@example.com").await.is_err());

    let user = env
        .users
        .find_by_email("alice@example.com")
        .await
        .unwrap()
        .unwrap();
    assert!(user.reset_token.is_none());
    assert!(user.reset_expires_at.is_none());
}

#[tokio::test]
async fn expired_reset_token_is_cleared_and_rejected() {
    let env = setup().await;
    env.service
        .register(register_input("alice@example.com", "Passw0rd!"))
        .await
        .unwrap();

    env.service.forgot_password("alice@example.com").await.unwrap();
    let reset_token = env.mailer.last_token().unwrap();

    // Reset tokens live one hour.
    env.clock.advance(Duration::hours(2));

    assert!(matches!(
        env.service
            .reset_password(&reset_token, "N3wPassword!")
            .await
            .unwrap_err(),
        SentraError::BadRequest { .. }
    ));

    let user = env
        .users
        .find_by_email("alice@example.com")
        .await
        .unwrap()
        .unwrap();
    assert!(user.reset_token.is_none());
}

#[tokio::test]
async fn reset_password_rejects_weak_replacement() {
    let env = setup().await;
    env.service
        .register(register_input("alice@example.com", "Passw0rd!"))
        .await
        .unwrap();

    env.service.forgot_password("alice@example.com").await.unwrap();
    let reset_token = env.mailer.last_token().unwrap();

    assert!(matches!(
        env.service.reset_password(&reset_token, "weak").await.unwrap_err(),
        SentraError::BadRequest { .. }
    ));
}

// ---------------------------------------------------------------------
// Email verification
// ---------------------------------------------------------------------

#[tokio::test]
async fn verify_email_flow() {
    let env = setup().await;
    env.service
        .register(register_input("alice@example.com", "Passw0rd!"))
        .await
        .unwrap();
    let verification_token = env.mailer.last_token().unwrap();

    env.service.verify_email(&verification_token).await.unwrap();

    let user = env
        .users
        .find_by_email("alice@example.com")
        .await
        .unwrap()
        .unwrap();
    assert!(user.email_verified);
    assert!(user.verification_token.is_none());

    // The consumed token is unknown afterwards.
    assert!(matches!(
        env.service.verify_email(&verification_token).await.unwrap_err(),
        SentraError::BadRequest { .. }
    ));
}

#[tokio::test]
async fn verify_email_is_idempotent_for_verified_holder() {
    let env = setup().await;
    let output = env
        .service
        .register(register_input("alice@example.com", "Passw0rd!"))
        .await
        .unwrap();
    let verification_token = env.mailer.last_token().unwrap();

    // Verified out-of-band while the token is still on the record.
    env.users
        .update(
            output.user.id,
            UpdateUser {
                email_verified: Some(true),
                ..UpdateUser::default()
            },
        )
        .await
        .unwrap();

    env.service.verify_email(&verification_token).await.unwrap();
}

#[tokio::test]
async fn expired_verification_token_is_rejected() {
    let env = setup().await;
    env.service
        .register(register_input("alice@example.com", "Passw0rd!"))
        .await
        .unwrap();
    let verification_token = env.mailer.last_token().unwrap();

    // Verification tokens live 24 hours.
    env.clock.advance(Duration::hours(25));

    assert!(matches!(
        env.service.verify_email(&verification_token).await.unwrap_err(),
        SentraError::BadRequest { .. }
    ));
}

#[tokio::test]
async fn resend_verification_rotates_the_token() {
    let env = setup().await;
    env.service
        .register(register_input("alice@example.com", "Passw0rd!"))
        .await
        .unwrap();
    let first_token = env.mailer.last_token().unwrap();

    env.service
        .resend_verification("alice@example.com")
        .await
        .unwrap();
    let second_token = env.mailer.last_token().unwrap();
    assert_ne!(first_token, second_token);

    // The old token is dead, the new one works.
    assert!(env.service.verify_email(&first_token).await.is_err());
    env.service.verify_email(&second_token).await.unwrap();

    // Already verified now.
    assert!(matches!(
        env.service
            .resend_verification("alice@example.com")
            .await
            .unwrap_err(),
        SentraError::BadRequest { .. }
    ));

    assert!(matches!(
        env.service
            .resend_verification("ghost@example.com")
            .await
            .unwrap_err(),
        SentraError::NotFound { .. }
    ));
}

// ---------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------

#[tokio::test]
async fn revoke_one_session_and_the_rest() {
    let env = setup().await;
    let output = env
        .service
        .register(register_input("alice@example.com", "Passw0rd!"))
        .await
        .unwrap();
    let login = env
        .service
        .login(login_input("alice@example.com", "Passw0rd!"))
        .await
        .unwrap();
    env.service
        .login(login_input("alice@example.com", "Passw0rd!"))
        .await
        .unwrap();

    let sessions = env.service.list_sessions(output.user.id).await.unwrap();
    assert_eq!(sessions.len(), 3);

    // Revoke the registration session (the only Firefox one).
    let registration = sessions
        .iter()
        .find(|s| s.device_info.as_deref() == Some("Firefox on Linux"))
        .unwrap();
    env.service
        .revoke_session(registration.id, output.user.id)
        .await
        .unwrap();
    assert_eq!(env.service.list_sessions(output.user.id).await.unwrap().len(), 2);

    // Keep only the first login's session.
    let revoked = env
        .service
        .revoke_other_sessions(output.user.id, Some(&login.tokens.refresh_token))
        .await
        .unwrap();
    assert_eq!(revoked, 1);

    let remaining = env.service.list_sessions(output.user.id).await.unwrap();
    assert_eq!(remaining.len(), 1);
}

// ---------------------------------------------------------------------
// Rate limiting
// ---------------------------------------------------------------------

#[tokio::test]
async fn sixth_login_attempt_is_rejected_before_credentials() {
    let env = setup().await;
    env.service
        .register(register_input("alice@example.com", "Passw0rd!"))
        .await
        .unwrap();

    // Five failed attempts from the same IP fill the window.
    for _ in 0..5 {
        let err = env
            .service
            .login(login_input("alice@example.com", "WrongPassw0rd"))
            .await
            .unwrap_err();
        assert!(matches!(err, SentraError::Unauthorized { .. }));
    }

    // The sixth attempt is denied at admission, even with the correct
    // password.
    let err = env
        .service
        .login(login_input("alice@example.com", "Passw0rd!"))
        .await
        .unwrap_err();
    assert!(matches!(err, SentraError::RateLimited));
}

#[tokio::test]
async fn successful_login_resets_the_login_counter() {
    let env = setup().await;
    env.service
        .register(register_input("alice@example.com", "Passw0rd!"))
        .await
        .unwrap();

    for _ in 0..4 {
        env.service
            .login(login_input("alice@example.com", "WrongPassw0rd"))
            .await
            .unwrap_err();
    }

    // The fifth attempt is still admitted and succeeds, clearing the
    // counter for this IP.
    env.service
        .login(login_input("alice@example.com", "Passw0rd!"))
        .await
        .unwrap();

    // A full window of failures is available again.
    for _ in 0..5 {
        let err = env
            .service
            .login(login_input("alice@example.com", "WrongPassw0rd"))
            .await
            .unwrap_err();
        assert!(matches!(err, SentraError::Unauthorized { .. }));
    }
    let err = env
        .service
        .login(login_input("alice@example.com", "Passw0rd!"))
        .await
        .unwrap_err();
    assert!(matches!(err, SentraError::RateLimited));
}

#[tokio::test]
async fn forgot_password_is_rate_limited_per_email() {
    let env = setup().await;
    env.service
        .register(register_input("alice@example.com", "Passw0rd!"))
        .await
        .unwrap();

    for _ in 0..3 {
        env.service.forgot_password("alice@example.com").await.unwrap();
    }

    // The fourth request in the window is denied; case variants of the
    // address share the counter.
    assert!(matches!(
        env.service
            .forgot_password("Alice@Example.COM")
            .await
            .unwrap_err(),
        SentraError::RateLimited
    ));

    // Other addresses are unaffected.
    assert!(matches!(
        env.service
            .forgot_password("ghost@example.com")
            .await
            .unwrap_err(),
        SentraError::NotFound { .. }
    ));
}

#[tokio::test]
async fn login_rate_limit_window() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    sentra_db::run_migrations(&db).await.unwrap();

    let clock = FixedClock::starting_now();
    let limiter = RateLimitService::new(
        SurrealRateLimitRepository::new(db),
        clock.clone() as Arc<dyn Clock>,
    );

    let action = RateLimitAction::LoginByIp;
    let ip = "203.0.113.9";

    // Five failed attempts are admitted, the sixth is not.
    for attempt in 0u32..5 {
        let decision = limiter.check(action, ip).await;
        assert!(decision.allowed, "attempt {attempt} should be admitted");
        assert_eq!(decision.remaining, 5 - attempt);
        limiter.increment(action, ip).await.unwrap();
    }

    let decision = limiter.check(action, ip).await;
    assert!(!decision.allowed);
    assert_eq!(decision.remaining, 0);
    assert!(decision.reset_at > clock.now());

    // A successful login clears the counter.
    limiter.reset(action, ip).await.unwrap();
    let decision = limiter.check(action, ip).await;
    assert!(decision.allowed);
    assert_eq!(decision.remaining, 5);
}

#[tokio::test]
async fn password_reset_rate_limit_normalizes_email() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    sentra_db::run_migrations(&db).await.unwrap();

    let clock = FixedClock::starting_now();
    let limiter = RateLimitService::new(
        SurrealRateLimitRepository::new(db),
        clock.clone() as Arc<dyn Clock>,
    );

    let action = RateLimitAction::PasswordResetByEmail;

    // Case variants hit the same counter.
    for _ in 0..3 {
        limiter.increment(action, "Alice@Example.COM").await.unwrap();
    }
    let decision = limiter.check(action, "alice@example.com").await;
    assert!(!decision.allowed);
}
