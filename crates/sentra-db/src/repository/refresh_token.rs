//! SurrealDB implementation of [`RefreshTokenRepository`].

use chrono::{DateTime, Utc};
use sentra_core::error::SentraResult;
use sentra_core::models::refresh_token::{CreateRefreshToken, RefreshToken};
use sentra_core::repository::RefreshTokenRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct RefreshTokenRow {
    token: String,
    user_id: String,
    expires_at: DateTime<Utc>,
    revoked: bool,
    device_info: Option<String>,
    ip_address: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct RefreshTokenRowWithId {
    record_id: String,
    token: String,
    user_id: String,
    expires_at: DateTime<Utc>,
    revoked: bool,
    device_info: Option<String>,
    ip_address: Option<String>,
    created_at: DateTime<Utc>,
}

fn row_to_token(row: RefreshTokenRow, id: Uuid) -> Result<RefreshToken, DbError> {
    let user_id = Uuid::parse_str(&row.user_id)
        .map_err(|e| DbError::Decode(format!("invalid user UUID: {e}")))?;
    Ok(RefreshToken {
        id,
        token: row.token,
        user_id,
        expires_at: row.expires_at,
        revoked: row.revoked,
        device_info: row.device_info,
        ip_address: row.ip_address,
        created_at: row.created_at,
    })
}

impl RefreshTokenRowWithId {
    fn try_into_token(self) -> Result<RefreshToken, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Decode(format!("invalid UUID: {e}")))?;
        let user_id = Uuid::parse_str(&self.user_id)
            .map_err(|e| DbError::Decode(format!("invalid user UUID: {e}")))?;
        Ok(RefreshToken {
            id,
            token: self.token,
            user_id,
            expires_at: self.expires_at,
            revoked: self.revoked,
            device_info: self.device_info,
            ip_address: self.ip_address,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the RefreshToken repository.
#[derive(Clone)]
pub struct SurrealRefreshTokenRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRefreshTokenRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> RefreshTokenRepository for SurrealRefreshTokenRepository<C> {
    async fn create(&self, input: CreateRefreshToken) -> SentraResult<RefreshToken> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('refresh_token', $id) SET \
                 token = $token_value, \
                 user_id = $user_id, \
                 expires_at = $expires_at, \
                 revoked = false, \
                 device_info = $device_info, \
                 ip_address = $ip_address",
            )
            .bind(("id", id_str.clone()))
            .bind(("token_value", input.token))
            .bind(("user_id", input.user_id.to_string()))
            .bind(("expires_at", input.expires_at))
            .bind(("device_info", input.device_info))
            .bind(("ip_address", input.ip_address))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Decode(e.to_string()))?;

        let rows: Vec<RefreshTokenRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "refresh_token".into(),
            id: id_str,
        })?;

        Ok(row_to_token(row, id)?)
    }

    async fn find(&self, token: &str) -> SentraResult<Option<RefreshToken>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM refresh_token \
                 WHERE token = $token_value",
            )
            .bind(("token_value", token.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RefreshTokenRowWithId> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_token()?)),
            None => Ok(None),
        }
    }

    async fn revoke(&self, token: &str) -> SentraResult<bool> {
        let mut result = self
            .db
            .query(
                "UPDATE refresh_token SET revoked = true \
                 WHERE token = $token_value AND revoked = false",
            )
            .bind(("token_value", token.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RefreshTokenRow> = result.take(0).map_err(DbError::from)?;
        Ok(!rows.is_empty())
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> SentraResult<u64> {
        let user_id_str = user_id.to_string();

        // Count live tokens first, then flip them.
        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM refresh_token \
                 WHERE user_id = $user_id AND revoked = false \
                 GROUP ALL",
            )
            .bind(("user_id", user_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        self.db
            .query(
                "UPDATE refresh_token SET revoked = true \
                 WHERE user_id = $user_id AND revoked = false",
            )
            .bind(("user_id", user_id_str))
            .await
            .map_err(DbError::from)?;

        Ok(total)
    }

    async fn find_active_for_user(&self, user_id: Uuid) -> SentraResult<Vec<RefreshToken>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM refresh_token \
                 WHERE user_id = $user_id AND revoked = false \
                 AND expires_at > time::now() \
                 ORDER BY created_at DESC",
            )
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RefreshTokenRowWithId> = result.take(0).map_err(DbError::from)?;
        let tokens = rows
            .into_iter()
            .map(|row| row.try_into_token())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(tokens)
    }

    async fn sweep_expired(&self) -> SentraResult<u64> {
        // Count expired tokens first, then delete.
        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM refresh_token \
                 WHERE expires_at < time::now() GROUP ALL",
            )
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        self.db
            .query("DELETE refresh_token WHERE expires_at < time::now()")
            .await
            .map_err(DbError::from)?;

        Ok(total)
    }
}
