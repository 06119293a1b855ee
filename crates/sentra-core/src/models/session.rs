//! Session domain model — one tracked device/browser instance.
//!
//! Sessions are keyed by the refresh token string they were issued with.
//! The session store and the refresh token store are updated
//! independently and are eventually, not atomically, consistent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    /// The refresh token string this session was issued with.
    pub token: String,
    pub user_id: Uuid,
    pub device_info: Option<String>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub location: Option<String>,
    pub is_active: bool,
    pub last_activity: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSession {
    pub token: String,
    pub user_id: Uuid,
    pub device_info: Option<String>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub location: Option<String>,
    pub expires_at: DateTime<Utc>,
}

/// Outward session projection — the refresh token string is never
/// exposed here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: Uuid,
    pub device_info: Option<String>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub location: Option<String>,
    pub is_active: bool,
    pub last_activity: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<Session> for SessionInfo {
    fn from(session: Session) -> Self {
        Self {
            id: session.id,
            device_info: session.device_info,
            user_agent: session.user_agent,
            ip_address: session.ip_address,
            location: session.location,
            is_active: session.is_active,
            last_activity: session.last_activity,
            expires_at: session.expires_at,
        }
    }
}
