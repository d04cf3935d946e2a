//! SQLite store backed by rusqlite. Calls run on the blocking pool.

use super::{QueryExecutor, SchemaProvider};
use crate::error::{AgentError, Result};
use crate::models::{DatabaseSchema, QueryResult, Record};
use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::info;

const SCHEMA_QUERY: &str = "
    SELECT m.name, p.name, p.type
    FROM sqlite_master m
    JOIN pragma_table_info(m.name) p
    WHERE m.type = 'table' AND m.name NOT LIKE 'sqlite_%'
    ORDER BY m.name, p.cid
";

#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Runs DDL/DML directly. Used for seeding; the agent itself never calls it.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(sql)?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AgentError::Database("SQLite connection lock poisoned".to_string()))
    }

    async fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| AgentError::Database("SQLite connection lock poisoned".to_string()))?;
            f(&guard)
        })
        .await
        .map_err(|e| AgentError::Database(format!("Blocking database task failed: {}", e)))?
    }
}

fn load_schema(conn: &Connection) -> Result<DatabaseSchema> {
    let mut stmt = conn.prepare(SCHEMA_QUERY)?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<String>>(2)?,
        ))
    })?;

    let mut schema = DatabaseSchema::new();
    for row in rows {
        let (table, column, data_type) = row?;
        schema.add_column(&table, &column, data_type.as_deref().unwrap_or(""));
    }
    Ok(schema)
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Value::from(f),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(format!("<{} bytes>", b.len())),
    }
}

fn run_query(conn: &Connection, sql: &str) -> Result<QueryResult> {
    let start = Instant::now();
    let mut stmt = conn.prepare(sql)?;
    let column_names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let mut records = Vec::new();
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let mut record = Record::new();
        for (idx, name) in column_names.iter().enumerate() {
            record.insert(name.clone(), to_json(row.get_ref(idx)?));
        }
        records.push(record);
    }

    let elapsed = start.elapsed().as_secs_f64() * 1000.0;
    Ok(QueryResult::new(records, column_names, elapsed))
}

#[async_trait]
impl SchemaProvider for SqliteStore {
    async fn get_schema(&self) -> Result<DatabaseSchema> {
        self.with_connection(load_schema).await
    }
}

#[async_trait]
impl QueryExecutor for SqliteStore {
    async fn execute(&self, query: &str) -> Result<QueryResult> {
        let sql = query.to_string();
        let result = self.with_connection(move |conn| run_query(conn, &sql)).await?;
        info!(
            "Query executed successfully. Returned {} rows in {:.2} ms",
            result.row_count, result.duration_ms
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn seeded() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .execute_batch(
                "CREATE TABLE models (model_id INTEGER PRIMARY KEY, model_code TEXT, segment TEXT, price REAL, badge BLOB);
                 INSERT INTO models VALUES (1, 'X1', 'SUV', 41000.5, x'0102');
                 INSERT INTO models VALUES (2, 'C3', 'Sedan', NULL, NULL);",
            )
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_schema_excludes_internal_tables() {
        let store = seeded();
        store
            .execute_batch("CREATE TABLE seq (id INTEGER PRIMARY KEY AUTOINCREMENT);")
            .unwrap();
        let schema = store.get_schema().await.unwrap();
        let tables: Vec<&str> = schema.table_names().collect();
        assert_eq!(tables, vec!["models", "seq"]);

        let columns = schema.columns("models").unwrap();
        assert_eq!(columns[0].column_name, "model_id");
        assert_eq!(columns[0].data_type, "INTEGER");
        assert_eq!(columns[3].column_name, "price");
    }

    #[tokio::test]
    async fn test_execute_maps_values() {
        let store = seeded();
        let result = store
            .execute("SELECT model_code, price, badge FROM models ORDER BY model_id")
            .await
            .unwrap();
        assert_eq!(result.row_count, 2);
        assert_eq!(result.column_names, vec!["model_code", "price", "badge"]);
        assert_eq!(result.rows[0]["model_code"], json!("X1"));
        assert_eq!(result.rows[0]["price"], json!(41000.5));
        assert_eq!(result.rows[0]["badge"], json!("<2 bytes>"));
        assert_eq!(result.rows[1]["price"], Value::Null);
        assert!(result.duration_ms >= 0.0);
    }

    #[tokio::test]
    async fn test_execute_error_is_database_error() {
        let store = seeded();
        let err = store.execute("SELECT * FROM ghost_table").await.unwrap_err();
        assert!(matches!(err, AgentError::Database(_)));
    }
}
