//! User domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Moderator,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "user" => Some(Role::User),
            "moderator" => Some(Role::Moderator),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Stored lowercase; unique.
    pub email: String,
    /// Argon2id PHC-format hash. `None` for OAuth-only accounts.
    pub password_hash: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub email_verified: bool,
    pub verification_token: Option<String>,
    pub verification_expires_at: Option<DateTime<Utc>>,
    pub reset_token: Option<String>,
    pub reset_expires_at: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub last_login_device: Option<String>,
    pub last_login_ip: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for user creation. Role and verification status are not inputs:
/// new users are always `Role::User` and unverified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub email: String,
    /// Already hashed. `None` creates an OAuth-only account.
    pub password_hash: Option<String>,
    pub verification_token: Option<String>,
    pub verification_expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateUser {
    /// `Some(Some(val))` = set, `Some(None)` = clear, `None` = no change.
    pub password_hash: Option<Option<String>>,
    pub email_verified: Option<bool>,
    pub is_active: Option<bool>,
    pub verification_token: Option<Option<String>>,
    pub verification_expires_at: Option<Option<DateTime<Utc>>>,
    pub reset_token: Option<Option<String>>,
    pub reset_expires_at: Option<Option<DateTime<Utc>>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub last_login_device: Option<Option<String>>,
    pub last_login_ip: Option<Option<String>>,
}

/// Outward user projection — never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserView {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
            is_active: user.is_active,
            email_verified: user.email_verified,
            created_at: user.created_at,
        }
    }
}
