//! SurrealDB connection bootstrap.

use std::env;

use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::info;

/// Connection settings, overridable through `SENTRA_DB_*` environment
/// variables.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// WebSocket URL (e.g., `127.0.0.1:8000`).
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "sentra".into(),
            database: "main".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

impl DbConfig {
    /// Build a configuration from `SENTRA_DB_*` environment variables,
    /// falling back to defaults for any that are unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            url: env::var("SENTRA_DB_URL").unwrap_or(defaults.url),
            namespace: env::var("SENTRA_DB_NAMESPACE").unwrap_or(defaults.namespace),
            database: env::var("SENTRA_DB_DATABASE").unwrap_or(defaults.database),
            username: env::var("SENTRA_DB_USERNAME").unwrap_or(defaults.username),
            password: env::var("SENTRA_DB_PASSWORD").unwrap_or(defaults.password),
        }
    }

    /// Open an authenticated connection and select the configured
    /// namespace and database.
    pub async fn connect(&self) -> Result<DbManager, surrealdb::Error> {
        let db = Surreal::new::<Ws>(&self.url).await?;
        db.signin(Root {
            username: self.username.clone(),
            password: self.password.clone(),
        })
        .await?;
        db.use_ns(&self.namespace).use_db(&self.database).await?;

        info!(
            url = %self.url,
            namespace = %self.namespace,
            database = %self.database,
            "connected to SurrealDB"
        );

        Ok(DbManager { db })
    }
}

/// Handle on an established connection. Cheap to clone; every clone
/// shares the same underlying client.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Client>,
}

impl DbManager {
    /// Returns a reference to the underlying SurrealDB client.
    pub fn client(&self) -> &Surreal<Client> {
        &self.db
    }
}
