//! SurrealDB implementation of [`SessionRepository`].

use chrono::{DateTime, Utc};
use sentra_core::error::SentraResult;
use sentra_core::models::session::{CreateSession, Session};
use sentra_core::repository::SessionRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct SessionRow {
    token: String,
    user_id: String,
    device_info: Option<String>,
    user_agent: Option<String>,
    ip_address: Option<String>,
    location: Option<String>,
    is_active: bool,
    last_activity: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct SessionRowWithId {
    record_id: String,
    token: String,
    user_id: String,
    device_info: Option<String>,
    user_agent: Option<String>,
    ip_address: Option<String>,
    location: Option<String>,
    is_active: bool,
    last_activity: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

fn row_to_session(row: SessionRow, id: Uuid) -> Result<Session, DbError> {
    let user_id = Uuid::parse_str(&row.user_id)
        .map_err(|e| DbError::Decode(format!("invalid user UUID: {e}")))?;
    Ok(Session {
        id,
        token: row.token,
        user_id,
        device_info: row.device_info,
        user_agent: row.user_agent,
        ip_address: row.ip_address,
        location: row.location,
        is_active: row.is_active,
        last_activity: row.last_activity,
        expires_at: row.expires_at,
        created_at: row.created_at,
    })
}

impl SessionRowWithId {
    fn try_into_session(self) -> Result<Session, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Decode(format!("invalid UUID: {e}")))?;
        let user_id = Uuid::parse_str(&self.user_id)
            .map_err(|e| DbError::Decode(format!("invalid user UUID: {e}")))?;
        Ok(Session {
            id,
            token: self.token,
            user_id,
            device_info: self.device_info,
            user_agent: self.user_agent,
            ip_address: self.ip_address,
            location: self.location,
            is_active: self.is_active,
            last_activity: self.last_activity,
            expires_at: self.expires_at,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the Session repository.
#[derive(Clone)]
pub struct SurrealSessionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealSessionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> SessionRepository for SurrealSessionRepository<C> {
    async fn create(&self, input: CreateSession) -> SentraResult<Session> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('session', $id) SET \
                 token = $token_value, \
                 user_id = $user_id, \
                 device_info = $device_info, \
                 user_agent = $user_agent, \
                 ip_address = $ip_address, \
                 location = $location, \
                 is_active = true, \
                 last_activity = time::now(), \
                 expires_at = $expires_at",
            )
            .bind(("id", id_str.clone()))
            .bind(("token_value", input.token))
            .bind(("user_id", input.user_id.to_string()))
            .bind(("device_info", input.device_info))
            .bind(("user_agent", input.user_agent))
            .bind(("ip_address", input.ip_address))
            .bind(("location", input.location))
            .bind(("expires_at", input.expires_at))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Decode(e.to_string()))?;

        let rows: Vec<SessionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "session".into(),
            id: id_str,
        })?;

        Ok(row_to_session(row, id)?)
    }

    async fn find_by_token(&self, token: &str, now: DateTime<Utc>) -> SentraResult<Option<Session>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM session \
                 WHERE token = $token_value AND is_active = true \
                 AND expires_at > $now",
            )
            .bind(("token_value", token.to_string()))
            .bind(("now", now))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SessionRowWithId> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_session()?)),
            None => Ok(None),
        }
    }

    async fn list_active(&self, user_id: Uuid, now: DateTime<Utc>) -> SentraResult<Vec<Session>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM session \
                 WHERE user_id = $user_id AND is_active = true \
                 AND expires_at > $now \
                 ORDER BY last_activity DESC",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("now", now))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SessionRowWithId> = result.take(0).map_err(DbError::from)?;
        let sessions = rows
            .into_iter()
            .map(|row| row.try_into_session())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(sessions)
    }

    async fn touch(&self, token: &str) -> SentraResult<()> {
        self.db
            .query(
                "UPDATE session SET last_activity = time::now() \
                 WHERE token = $token_value AND is_active = true",
            )
            .bind(("token_value", token.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn revoke(&self, session_id: Uuid, user_id: Uuid) -> SentraResult<()> {
        let id_str = session_id.to_string();

        let mut result = self
            .db
            .query(
                "UPDATE type::record('session', $id) SET is_active = false \
                 WHERE user_id = $user_id AND is_active = true",
            )
            .bind(("id", id_str.clone()))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        // A session owned by someone else, or one already revoked, is
        // indistinguishable from a missing one.
        let rows: Vec<SessionRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(DbError::NotFound {
                entity: "session".into(),
                id: id_str,
            }
            .into());
        }

        Ok(())
    }

    async fn revoke_by_token(&self, token: &str) -> SentraResult<()> {
        self.db
            .query("UPDATE session SET is_active = false WHERE token = $token_value")
            .bind(("token_value", token.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn revoke_all_except_current(
        &self,
        user_id: Uuid,
        current_token: Option<&str>,
    ) -> SentraResult<u64> {
        let user_id_str = user_id.to_string();

        // Token comparison tolerates case and surrounding whitespace.
        let filter = match current_token {
            Some(_) => {
                "user_id = $user_id AND is_active = true \
                 AND string::lowercase(string::trim(token)) != $current"
            }
            None => "user_id = $user_id AND is_active = true",
        };
        let current_norm = current_token.map(|t| t.trim().to_lowercase());

        // Count matching sessions first, then flip them.
        let count_query =
            format!("SELECT count() AS total FROM session WHERE {filter} GROUP ALL");
        let mut count_builder = self
            .db
            .query(&count_query)
            .bind(("user_id", user_id_str.clone()));
        if let Some(ref current) = current_norm {
            count_builder = count_builder.bind(("current", current.clone()));
        }
        let mut count_result = count_builder.await.map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let update_query = format!("UPDATE session SET is_active = false WHERE {filter}");
        let mut update_builder = self.db.query(&update_query).bind(("user_id", user_id_str));
        if let Some(current) = current_norm {
            update_builder = update_builder.bind(("current", current));
        }
        update_builder.await.map_err(DbError::from)?;

        Ok(total)
    }

    async fn sweep_expired(&self) -> SentraResult<u64> {
        // Count expired sessions first, then delete.
        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM session \
                 WHERE expires_at < time::now() GROUP ALL",
            )
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        self.db
            .query("DELETE session WHERE expires_at < time::now()")
            .await
            .map_err(DbError::from)?;

        Ok(total)
    }
}
