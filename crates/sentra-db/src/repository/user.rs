//! SurrealDB implementation of [`UserRepository`].

use chrono::{DateTime, Utc};
use sentra_core::error::SentraResult;
use sentra_core::models::user::{CreateUser, Role, UpdateUser, User};
use sentra_core::repository::UserRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct UserRow {
    email: String,
    password_hash: Option<String>,
    role: String,
    is_active: bool,
    email_verified: bool,
    verification_token: Option<String>,
    verification_expires_at: Option<DateTime<Utc>>,
    reset_token: Option<String>,
    reset_expires_at: Option<DateTime<Utc>>,
    last_login_at: Option<DateTime<Utc>>,
    last_login_device: Option<String>,
    last_login_ip: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct UserRowWithId {
    record_id: String,
    email: String,
    password_hash: Option<String>,
    role: String,
    is_active: bool,
    email_verified: bool,
    verification_token: Option<String>,
    verification_expires_at: Option<DateTime<Utc>>,
    reset_token: Option<String>,
    reset_expires_at: Option<DateTime<Utc>>,
    last_login_at: Option<DateTime<Utc>>,
    last_login_device: Option<String>,
    last_login_ip: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_role(s: &str) -> Result<Role, DbError> {
    Role::parse(s).ok_or_else(|| DbError::Decode(format!("unknown user role: {s}")))
}

impl UserRow {
    fn into_user(self, id: Uuid) -> Result<User, DbError> {
        Ok(User {
            id,
            email: self.email,
            password_hash: self.password_hash,
            role: parse_role(&self.role)?,
            is_active: self.is_active,
            email_verified: self.email_verified,
            verification_token: self.verification_token,
            verification_expires_at: self.verification_expires_at,
            reset_token: self.reset_token,
            reset_expires_at: self.reset_expires_at,
            last_login_at: self.last_login_at,
            last_login_device: self.last_login_device,
            last_login_ip: self.last_login_ip,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl UserRowWithId {
    fn try_into_user(self) -> Result<User, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Decode(format!("invalid UUID: {e}")))?;
        Ok(User {
            id,
            email: self.email,
            password_hash: self.password_hash,
            role: parse_role(&self.role)?,
            is_active: self.is_active,
            email_verified: self.email_verified,
            verification_token: self.verification_token,
            verification_expires_at: self.verification_expires_at,
            reset_token: self.reset_token,
            reset_expires_at: self.reset_expires_at,
            last_login_at: self.last_login_at,
            last_login_device: self.last_login_device,
            last_login_ip: self.last_login_ip,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: CreateUser) -> SentraResult<User> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('user', $id) SET \
                 email = $email, \
                 password_hash = $password_hash, \
                 role = 'user', \
                 is_active = true, \
                 email_verified = false, \
                 verification_token = $verification_token, \
                 verification_expires_at = $verification_expires_at, \
                 reset_token = NONE, \
                 reset_expires_at = NONE, \
                 last_login_at = NONE, \
                 last_login_device = NONE, \
                 last_login_ip = NONE",
            )
            .bind(("id", id_str.clone()))
            .bind(("email", input.email))
            .bind(("password_hash", input.password_hash))
            .bind(("verification_token", input.verification_token))
            .bind(("verification_expires_at", input.verification_expires_at))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Decode(e.to_string()))?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(row.into_user(id)?)
    }

    async fn find_by_id(&self, id: Uuid) -> SentraResult<Option<User>> {
        let mut result = self
            .db
            .query("SELECT * FROM type::record('user', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.into_user(id)?)),
            None => Ok(None),
        }
    }

    async fn find_by_email(&self, email: &str) -> SentraResult<Option<User>> {
        self.find_one_by("email", email).await
    }

    async fn find_by_verification_token(&self, token: &str) -> SentraResult<Option<User>> {
        self.find_one_by("verification_token", token).await
    }

    async fn find_by_reset_token(&self, token: &str) -> SentraResult<Option<User>> {
        self.find_one_by("reset_token", token).await
    }

    async fn update(&self, id: Uuid, input: UpdateUser) -> SentraResult<User> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.password_hash.is_some() {
            sets.push("password_hash = $password_hash");
        }
        if input.email_verified.is_some() {
            sets.push("email_verified = $email_verified");
        }
        if input.is_active.is_some() {
            sets.push("is_active = $is_active");
        }
        if input.verification_token.is_some() {
            sets.push("verification_token = $verification_token");
        }
        if input.verification_expires_at.is_some() {
            sets.push("verification_expires_at = $verification_expires_at");
        }
        if input.reset_token.is_some() {
            sets.push("reset_token = $reset_token");
        }
        if input.reset_expires_at.is_some() {
            sets.push("reset_expires_at = $reset_expires_at");
        }
        if input.last_login_at.is_some() {
            sets.push("last_login_at = $last_login_at");
        }
        if input.last_login_device.is_some() {
            sets.push("last_login_device = $last_login_device");
        }
        if input.last_login_ip.is_some() {
            sets.push("last_login_ip = $last_login_ip");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('user', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        // Option<Option<T>> fields: Some(Some(v)) = set, Some(None) = clear.
        if let Some(password_hash) = input.password_hash {
            builder = builder.bind(("password_hash", password_hash));
        }
        if let Some(email_verified) = input.email_verified {
            builder = builder.bind(("email_verified", email_verified));
        }
        if let Some(is_active) = input.is_active {
            builder = builder.bind(("is_active", is_active));
        }
        if let Some(verification_token) = input.verification_token {
            builder = builder.bind(("verification_token", verification_token));
        }
        if let Some(verification_expires_at) = input.verification_expires_at {
            builder = builder.bind(("verification_expires_at", verification_expires_at));
        }
        if let Some(reset_token) = input.reset_token {
            builder = builder.bind(("reset_token", reset_token));
        }
        if let Some(reset_expires_at) = input.reset_expires_at {
            builder = builder.bind(("reset_expires_at", reset_expires_at));
        }
        if let Some(last_login_at) = input.last_login_at {
            builder = builder.bind(("last_login_at", last_login_at));
        }
        if let Some(last_login_device) = input.last_login_device {
            builder = builder.bind(("last_login_device", last_login_device));
        }
        if let Some(last_login_ip) = input.last_login_ip {
            builder = builder.bind(("last_login_ip", last_login_ip));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Decode(e.to_string()))?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(row.into_user(id)?)
    }
}

impl<C: Connection> SurrealUserRepository<C> {
    /// Single-row lookup on an indexed string column.
    async fn find_one_by(&self, column: &str, value: &str) -> SentraResult<Option<User>> {
        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM user WHERE {column} = $value"
        );

        let mut result = self
            .db
            .query(&query)
            .bind(("value", value.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_user()?)),
            None => Ok(None),
        }
    }
}
