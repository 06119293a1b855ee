//! Authentication service — registration, login, refresh, and
//! account-recovery orchestration.

use std::sync::Arc;

use chrono::Duration;
use sentra_core::Clock;
use sentra_core::error::{SentraError, SentraResult};
use sentra_core::mailer::Mailer;
use sentra_core::models::refresh_token::CreateRefreshToken;
use sentra_core::models::session::{CreateSession, SessionInfo};
use sentra_core::models::user::{CreateUser, UpdateUser, User, UserView};
use sentra_core::repository::{
    RateLimitRepository, RefreshTokenRepository, SessionRepository, UserRepository,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::password;
use crate::rate_limit::{RateLimitAction, RateLimitService};
use crate::token;
use crate::validate;

/// Input for the registration flow.
#[derive(Debug)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub device_info: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub location: Option<String>,
}

/// Input for the login flow.
#[derive(Debug)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
    pub device_info: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub location: Option<String>,
}

/// Signed token pair handed to the client.
#[derive(Debug, Clone)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// Successful registration or login result.
#[derive(Debug)]
pub struct AuthOutput {
    pub tokens: AuthTokens,
    pub user: UserView,
}

/// Successful refresh result. Only the access token is reissued; the
/// refresh token string stays valid until revoked or expired.
#[derive(Debug)]
pub struct RefreshOutput {
    pub access_token: String,
}

/// Authentication service.
///
/// Generic over repository implementations so that the auth layer has
/// no dependency on the database crate. All collaborators are injected
/// through the constructor.
pub struct AuthService<U, R, S, L, M>
where
    U: UserRepository,
    R: RefreshTokenRepository,
    S: SessionRepository,
    L: RateLimitRepository,
    M: Mailer,
{
    users: U,
    refresh_tokens: R,
    sessions: S,
    rate_limits: RateLimitService<L>,
    mailer: M,
    clock: Arc<dyn Clock>,
    config: AuthConfig,
}

impl<U, R, S, L, M> AuthService<U, R, S, L, M>
where
    U: UserRepository,
    R: RefreshTokenRepository,
    S: SessionRepository,
    L: RateLimitRepository,
    M: Mailer,
{
    pub fn new(
        users: U,
        refresh_tokens: R,
        sessions: S,
        rate_limits: RateLimitService<L>,
        mailer: M,
        clock: Arc<dyn Clock>,
        config: AuthConfig,
    ) -> Self {
        Self {
            users,
            refresh_tokens,
            sessions,
            rate_limits,
            mailer,
            clock,
            config,
        }
    }

    /// Register a new account and log it in.
    ///
    /// The verification email is best-effort: a send failure is logged
    /// and the registration still succeeds.
    pub async fn register(&self, input: RegisterInput) -> SentraResult<AuthOutput> {
        // 1. Validate input.
        validate::validate_email(&input.email)?;
        validate::validate_password(&input.password, self.config.min_password_length)?;

        let email = input.email.trim().to_lowercase();

        // 2. Reject duplicate emails.
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailTaken.into());
        }

        // 3. Hash the password and create the user with a pending
        //    verification token.
        let password_hash =
            password::hash_password(&input.password, self.config.pepper.as_deref())?;
        let verification_token = token::generate_one_time_token();
        let verification_expires_at = self.clock.now()
            + Duration::seconds(self.config.verification_token_lifetime_secs as i64);

        let user = self
            .users
            .create(CreateUser {
                email: email.clone(),
                password_hash: Some(password_hash),
                verification_token: Some(verification_token.clone()),
                verification_expires_at: Some(verification_expires_at),
            })
            .await?;

        // 4. Issue tokens and record the device.
        let tokens = self
            .issue_pair(
                &user,
                input.device_info,
                input.ip_address,
                input.user_agent,
                input.location,
            )
            .await?;

        // 5. Best-effort verification email.
        if let Err(err) = self
            .mailer
            .send_verification(&email, &verification_token)
            .await
        {
            warn!(user_id = %user.id, error = %err, "verification email failed to send");
        }

        info!(user_id = %user.id, "user registered");
        Ok(AuthOutput {
            user: UserView::from(&user),
            tokens,
        })
    }

    /// Authenticate with email + password and issue a token pair.
    ///
    /// Admission is checked against the per-IP login counter before any
    /// credential is looked at; a denied attempt never reaches the user
    /// store. Failed attempts increment the counter, a successful login
    /// resets it. Absent user, OAuth-only account, wrong password, and
    /// inactive account are all rejected with the same `Unauthorized`
    /// error.
    pub async fn login(&self, input: LoginInput) -> SentraResult<AuthOutput> {
        let ip = input.ip_address.clone();

        if let Some(ip) = ip.as_deref() {
            let decision = self.rate_limits.check(RateLimitAction::LoginByIp, ip).await;
            if !decision.allowed {
                warn!(ip, "login attempt rejected by rate limiter");
                return Err(SentraError::RateLimited);
            }
        }

        match self.verify_and_login(input).await {
            Ok(output) => {
                if let Some(ip) = ip.as_deref() {
                    if let Err(err) = self.rate_limits.reset(RateLimitAction::LoginByIp, ip).await {
                        warn!(ip, error = %err, "login rate limit reset failed");
                    }
                }
                Ok(output)
            }
            Err(err) => {
                // Only credential failures count against the limit.
                if matches!(err, SentraError::Unauthorized { .. }) {
                    if let Some(ip) = ip.as_deref() {
                        if let Err(inc_err) = self
                            .rate_limits
                            .increment(RateLimitAction::LoginByIp, ip)
                            .await
                        {
                            warn!(ip, error = %inc_err, "login rate limit increment failed");
                        }
                    }
                }
                Err(err)
            }
        }
    }

    async fn verify_and_login(&self, input: LoginInput) -> SentraResult<AuthOutput> {
        let email = input.email.trim().to_lowercase();

        // 1. Look up user.
        let Some(user) = self.users.find_by_email(&email).await? else {
            return Err(AuthError::InvalidCredentials.into());
        };

        // 2. Verify password. Accounts without one cannot log in this way.
        let Some(hash) = user.password_hash.as_deref() else {
            return Err(AuthError::InvalidCredentials.into());
        };
        let valid =
            password::verify_password(&input.password, hash, self.config.pepper.as_deref())?;
        if !valid {
            return Err(AuthError::InvalidCredentials.into());
        }

        // 3. Check account status.
        if !user.is_active {
            return Err(AuthError::InvalidCredentials.into());
        }

        // 4. Record the login.
        let now = self.clock.now();
        let user = self
            .users
            .update(
                user.id,
                UpdateUser {
                    last_login_at: Some(now),
                    last_login_device: Some(input.device_info.clone()),
                    last_login_ip: Some(input.ip_address.clone()),
                    ..UpdateUser::default()
                },
            )
            .await?;

        // 5. Issue tokens and record the device.
        let tokens = self
            .issue_pair(
                &user,
                input.device_info.clone(),
                input.ip_address.clone(),
                input.user_agent,
                input.location.clone(),
            )
            .await?;

        // 6. Best-effort login notification.
        if let Err(err) = self
            .mailer
            .send_login_notification(
                &user.email,
                input.device_info.as_deref().unwrap_or("unknown device"),
                input.ip_address.as_deref(),
                input.location.as_deref(),
            )
            .await
        {
            warn!(user_id = %user.id, error = %err, "login notification failed to send");
        }

        info!(user_id = %user.id, "user logged in");
        Ok(AuthOutput {
            user: UserView::from(&user),
            tokens,
        })
    }

    /// Exchange a valid refresh token for a new access token.
    ///
    /// The refresh token itself is not rotated. Verification is
    /// layered: codec signature/expiry, stored-record state, and
    /// account state must all pass; every failure surfaces as the same
    /// `Unauthorized` error.
    pub async fn refresh(&self, refresh_token: &str) -> SentraResult<RefreshOutput> {
        // 1. Codec check first; garbage never reaches the store.
        let claims = match token::verify_refresh_token(refresh_token, &self.config) {
            Ok(claims) => claims,
            Err(err) => {
                let sub = token::decode_unsafe(refresh_token).map(|c| c.sub);
                warn!(kind = err.kind(), sub = ?sub, "refresh token rejected by codec");
                return Err(AuthError::InvalidToken.into());
            }
        };

        // 2. The record must exist, be unrevoked, and be unexpired.
        let Some(record) = self.refresh_tokens.find(refresh_token).await? else {
            warn!("refresh token not found in store");
            return Err(AuthError::InvalidToken.into());
        };
        if record.revoked {
            warn!(user_id = %record.user_id, "refresh token is revoked");
            return Err(AuthError::InvalidToken.into());
        }
        if record.expires_at <= self.clock.now() {
            warn!(user_id = %record.user_id, "refresh token record is expired");
            return Err(AuthError::InvalidToken.into());
        }

        // 3. Claims and record must agree on the subject.
        if claims.sub != record.user_id.to_string() {
            warn!(user_id = %record.user_id, "refresh token subject mismatch");
            return Err(AuthError::InvalidToken.into());
        }

        // 4. The account must still exist and be active.
        let Some(user) = self.users.find_by_id(record.user_id).await? else {
            return Err(AuthError::InvalidToken.into());
        };
        if !user.is_active {
            return Err(AuthError::InvalidToken.into());
        }

        // 5. Reissue the access token only.
        let access_token = token::issue_access_token(
            user.id,
            &user.email,
            user.role,
            self.clock.now(),
            &self.config,
        )?;

        // Best-effort activity bump on the session tied to this token.
        if let Err(err) = self.sessions.touch(refresh_token).await {
            warn!(user_id = %user.id, error = %err, "session touch failed");
        }

        Ok(RefreshOutput { access_token })
    }

    /// Revoke a refresh token and its session. Idempotent: an unknown
    /// or already-revoked token is still a successful logout.
    pub async fn logout(&self, refresh_token: &str) -> SentraResult<()> {
        let revoked = self.refresh_tokens.revoke(refresh_token).await?;
        self.sessions.revoke_by_token(refresh_token).await?;
        if revoked {
            info!("refresh token revoked on logout");
        }
        Ok(())
    }

    /// Start the password reset flow: persist a one-time token and
    /// email it.
    ///
    /// Requests are rate limited per email address, and every admitted
    /// request is counted, known address or not. If the email cannot be
    /// sent the token is cleared again, so no reset token exists that
    /// the user never received.
    pub async fn forgot_password(&self, email: &str) -> SentraResult<()> {
        let email = email.trim().to_lowercase();

        let decision = self
            .rate_limits
            .check(RateLimitAction::PasswordResetByEmail, &email)
            .await;
        if !decision.allowed {
            warn!("password reset request rejected by rate limiter");
            return Err(SentraError::RateLimited);
        }
        if let Err(err) = self
            .rate_limits
            .increment(RateLimitAction::PasswordResetByEmail, &email)
            .await
        {
            warn!(error = %err, "password reset rate limit increment failed");
        }

        let Some(user) = self.users.find_by_email(&email).await? else {
            return Err(SentraError::NotFound {
                entity: "user".into(),
                id: email,
            });
        };
        if user.password_hash.is_none() {
            return Err(SentraError::BadRequest {
                message: "account has no password to reset".into(),
            });
        }

        let reset_token = token::generate_one_time_token();
        let expires_at =
            self.clock.now() + Duration::seconds(self.config.reset_token_lifetime_secs as i64);

        self.users
            .update(
                user.id,
                UpdateUser {
                    reset_token: Some(Some(reset_token.clone())),
                    reset_expires_at: Some(Some(expires_at)),
                    ..UpdateUser::default()
                },
            )
            .await?;

        if let Err(err) = self.mailer.send_password_reset(&email, &reset_token).await {
            // Roll back: a token the user never received must not stay live.
            self.users
                .update(
                    user.id,
                    UpdateUser {
                        reset_token: Some(None),
                        reset_expires_at: Some(None),
                        ..UpdateUser::default()
                    },
                )
                .await?;
            return Err(err);
        }

        info!(user_id = %user.id, "password reset token issued");
        Ok(())
    }

    /// Complete the password reset flow. On success every refresh token
    /// and session for the account is revoked.
    pub async fn reset_password(&self, reset_token: &str, new_password: &str) -> SentraResult<()> {
        let Some(user) = self.users.find_by_reset_token(reset_token).await? else {
            return Err(SentraError::BadRequest {
                message: "invalid or expired reset token".into(),
            });
        };

        let expired = match user.reset_expires_at {
            Some(expires_at) => expires_at <= self.clock.now(),
            None => true,
        };
        if expired {
            // Clear the stale token so it cannot be retried.
            self.users
                .update(
                    user.id,
                    UpdateUser {
                        reset_token: Some(None),
                        reset_expires_at: Some(None),
                        ..UpdateUser::default()
                    },
                )
                .await?;
            return Err(SentraError::BadRequest {
                message: "invalid or expired reset token".into(),
            });
        }

        validate::validate_password(new_password, self.config.min_password_length)?;

        let password_hash = password::hash_password(new_password, self.config.pepper.as_deref())?;
        self.users
            .update(
                user.id,
                UpdateUser {
                    password_hash: Some(Some(password_hash)),
                    reset_token: Some(None),
                    reset_expires_at: Some(None),
                    ..UpdateUser::default()
                },
            )
            .await?;

        // Force re-authentication everywhere.
        let tokens_revoked = self.refresh_tokens.revoke_all_for_user(user.id).await?;
        let sessions_revoked = self
            .sessions
            .revoke_all_except_current(user.id, None)
            .await?;

        info!(
            user_id = %user.id,
            tokens_revoked,
            sessions_revoked,
            "password reset completed"
        );
        Ok(())
    }

    /// Mark an email address verified. Verifying an already-verified
    /// holder is a no-op success.
    pub async fn verify_email(&self, verification_token: &str) -> SentraResult<()> {
        let Some(user) = self
            .users
            .find_by_verification_token(verification_token)
            .await?
        else {
            return Err(SentraError::BadRequest {
                message: "invalid or expired verification token".into(),
            });
        };

        if user.email_verified {
            return Ok(());
        }

        let expired = match user.verification_expires_at {
            Some(expires_at) => expires_at <= self.clock.now(),
            None => true,
        };
        if expired {
            return Err(SentraError::BadRequest {
                message: "invalid or expired verification token".into(),
            });
        }

        self.users
            .update(
                user.id,
                UpdateUser {
                    email_verified: Some(true),
                    verification_token: Some(None),
                    verification_expires_at: Some(None),
                    ..UpdateUser::default()
                },
            )
            .await?;

        info!(user_id = %user.id, "email verified");
        Ok(())
    }

    /// Issue a fresh verification token and resend the email. A send
    /// failure restores the previous token state.
    pub async fn resend_verification(&self, email: &str) -> SentraResult<()> {
        let email = email.trim().to_lowercase();
        let Some(user) = self.users.find_by_email(&email).await? else {
            return Err(SentraError::NotFound {
                entity: "user".into(),
                id: email,
            });
        };
        if user.email_verified {
            return Err(SentraError::BadRequest {
                message: "email is already verified".into(),
            });
        }

        let verification_token = token::generate_one_time_token();
        let expires_at = self.clock.now()
            + Duration::seconds(self.config.verification_token_lifetime_secs as i64);

        self.users
            .update(
                user.id,
                UpdateUser {
                    verification_token: Some(Some(verification_token.clone())),
                    verification_expires_at: Some(Some(expires_at)),
                    ..UpdateUser::default()
                },
            )
            .await?;

        if let Err(err) = self
            .mailer
            .send_verification(&email, &verification_token)
            .await
        {
            self.users
                .update(
                    user.id,
                    UpdateUser {
                        verification_token: Some(user.verification_token.clone()),
                        verification_expires_at: Some(user.verification_expires_at),
                        ..UpdateUser::default()
                    },
                )
                .await?;
            return Err(err);
        }

        Ok(())
    }

    /// Active sessions for a user, newest activity first.
    pub async fn list_sessions(&self, user_id: Uuid) -> SentraResult<Vec<SessionInfo>> {
        let sessions = self.sessions.list_active(user_id, self.clock.now()).await?;
        Ok(sessions.into_iter().map(SessionInfo::from).collect())
    }

    /// Bump a session's activity timestamp. Never fails the request it
    /// rides on.
    pub async fn touch_session(&self, refresh_token: &str) {
        if let Err(err) = self.sessions.touch(refresh_token).await {
            warn!(error = %err, "session touch failed");
        }
    }

    /// Revoke one session, enforcing ownership.
    pub async fn revoke_session(&self, session_id: Uuid, user_id: Uuid) -> SentraResult<()> {
        self.sessions.revoke(session_id, user_id).await
    }

    /// Revoke every other session for the user, keeping the one tied to
    /// `current_token` if given. Returns how many were revoked.
    pub async fn revoke_other_sessions(
        &self,
        user_id: Uuid,
        current_token: Option<&str>,
    ) -> SentraResult<u64> {
        self.sessions
            .revoke_all_except_current(user_id, current_token)
            .await
    }

    /// Issue a token pair, persist the refresh token record, and create
    /// the session for this device.
    async fn issue_pair(
        &self,
        user: &User,
        device_info: Option<String>,
        ip_address: Option<String>,
        user_agent: Option<String>,
        location: Option<String>,
    ) -> SentraResult<AuthTokens> {
        let now = self.clock.now();
        let access_token =
            token::issue_access_token(user.id, &user.email, user.role, now, &self.config)?;
        let refresh_token =
            token::issue_refresh_token(user.id, &user.email, user.role, now, &self.config)?;
        let expires_at = now + Duration::seconds(self.config.refresh_token_lifetime_secs as i64);

        self.refresh_tokens
            .create(CreateRefreshToken {
                user_id: user.id,
                token: refresh_token.clone(),
                expires_at,
                device_info: device_info.clone(),
                ip_address: ip_address.clone(),
            })
            .await?;

        self.sessions
            .create(CreateSession {
                token: refresh_token.clone(),
                user_id: user.id,
                device_info,
                user_agent,
                ip_address,
                location,
                expires_at,
            })
            .await?;

        Ok(AuthTokens {
            access_token,
            refresh_token,
        })
    }
}
