//! Database module for schema discovery and read-only query execution
//!
//! The workflow only sees the two traits below. `connect` picks a concrete
//! store from the connection URL.

pub mod postgres;
pub mod sqlite;

use crate::error::{AgentError, Result};
use crate::models::{DatabaseSchema, QueryResult};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;

/// Table name → ordered columns, fetched once and treated as static.
#[async_trait]
pub trait SchemaProvider: Send + Sync {
    async fn get_schema(&self) -> Result<DatabaseSchema>;
}

/// Runs a query and returns its rows, column names and elapsed time.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, query: &str) -> Result<QueryResult>;
}

/// Where a connection URL points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    SqliteMemory,
    SqliteFile(PathBuf),
    Postgres(String),
}

impl StoreLocation {
    pub fn parse(url: &str) -> Result<Self> {
        let url = url.trim();
        if url == "sqlite::memory:" || url == "sqlite://:memory:" {
            return Ok(StoreLocation::SqliteMemory);
        }
        if let Some(path) = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
        {
            if path.is_empty() {
                return Err(AgentError::Config("SQLite URL has no path".to_string()));
            }
            return Ok(StoreLocation::SqliteFile(PathBuf::from(path)));
        }
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            return Ok(StoreLocation::Postgres(url.to_string()));
        }
        if url.ends_with(".db") || url.ends_with(".sqlite") || url.ends_with(".sqlite3") {
            return Ok(StoreLocation::SqliteFile(PathBuf::from(url)));
        }
        Err(AgentError::Config(format!(
            "Unsupported database URL: {}",
            url
        )))
    }
}

/// A connected store of either flavor.
pub enum Database {
    Sqlite(SqliteStore),
    Postgres(PostgresStore),
}

pub async fn connect(url: &str) -> Result<Database> {
    match StoreLocation::parse(url)? {
        StoreLocation::SqliteMemory => {
            info!("Opening in-memory SQLite database");
            Ok(Database::Sqlite(SqliteStore::open_in_memory()?))
        }
        StoreLocation::SqliteFile(path) => {
            info!("Opening SQLite database at {}", path.display());
            Ok(Database::Sqlite(SqliteStore::open(&path)?))
        }
        StoreLocation::Postgres(url) => {
            info!("Connecting to PostgreSQL");
            Ok(Database::Postgres(PostgresStore::connect(&url).await?))
        }
    }
}

#[async_trait]
impl SchemaProvider for Database {
    async fn get_schema(&self) -> Result<DatabaseSchema> {
        match self {
            Database::Sqlite(store) => store.get_schema().await,
            Database::Postgres(store) => store.get_schema().await,
        }
    }
}

#[async_trait]
impl QueryExecutor for Database {
    async fn execute(&self, query: &str) -> Result<QueryResult> {
        match self {
            Database::Sqlite(store) => store.execute(query).await,
            Database::Postgres(store) => store.execute(query).await,
        }
    }
}
