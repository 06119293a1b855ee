//! Refresh token domain model.
//!
//! The token string is the signed refresh JWT, stored verbatim. It is
//! never rotated on use — only the access token is reissued. A record
//! that is revoked or past `expires_at` must never authorize a refresh,
//! whether or not the expiry sweep has run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshToken {
    pub id: Uuid,
    pub token: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    /// One-way transition; never flips back to false.
    pub revoked: bool,
    pub device_info: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRefreshToken {
    pub user_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub device_info: Option<String>,
    pub ip_address: Option<String>,
}
