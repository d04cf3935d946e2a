//! PostgreSQL store using an sqlx connection pool

use super::{QueryExecutor, SchemaProvider};
use crate::error::{AgentError, Result};
use crate::models::{DatabaseSchema, QueryResult, Record};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Column, Executor, Statement};
use std::time::{Duration, Instant};
use tracing::info;

const SCHEMA_QUERY: &str = r#"
    SELECT table_name::text, column_name::text, data_type::text
    FROM information_schema.columns
    WHERE table_schema = 'public'
    ORDER BY table_name, ordinal_position
"#;

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .connect(database_url)
            .await?;

        sqlx::query("SELECT 1").execute(&pool).await?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Wraps a query so each row comes back as one JSON object. The inner query
/// sits on its own lines so a trailing `--` comment cannot swallow the
/// closing parenthesis.
pub fn row_json_query(query: &str) -> String {
    let inner = query.trim().trim_end_matches(';').trim_end();
    format!("SELECT row_to_json(t)::text FROM (\n{}\n) AS t", inner)
}

#[async_trait]
impl SchemaProvider for PostgresStore {
    async fn get_schema(&self) -> Result<DatabaseSchema> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(SCHEMA_QUERY)
            .fetch_all(&self.pool)
            .await?;

        let mut schema = DatabaseSchema::new();
        for (table, column, data_type) in rows {
            schema.add_column(&table, &column, &data_type);
        }
        Ok(schema)
    }
}

#[async_trait]
impl QueryExecutor for PostgresStore {
    async fn execute(&self, query: &str) -> Result<QueryResult> {
        let start = Instant::now();

        let statement = (&self.pool).prepare(query).await?;
        let column_names: Vec<String> = statement
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        let rows: Vec<String> = sqlx::query_scalar(&row_json_query(query))
            .fetch_all(&self.pool)
            .await?;

        let records = rows
            .iter()
            .map(|text| {
                serde_json::from_str::<Record>(text)
                    .map_err(|e| AgentError::Database(format!("Unreadable row: {}", e)))
            })
            .collect::<Result<Vec<_>>>()?;

        let elapsed = start.elapsed().as_secs_f64() * 1000.0;
        let result = QueryResult::new(records, column_names, elapsed);
        info!(
            "Query executed successfully. Returned {} rows in {:.2} ms",
            result.row_count, result.duration_ms
        );
        Ok(result)
    }
}
