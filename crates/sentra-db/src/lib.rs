//! Sentra Database — SurrealDB connection management, schema
//! migrations, and repository implementations for the `sentra-core`
//! traits.

mod connection;
mod error;
mod schema;

pub mod repository;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use schema::{run_migrations, schema_v1};
