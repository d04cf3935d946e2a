use serde_json::json;
use tempfile::TempDir;
use ticket_analyst::db::{self, QueryExecutor, SchemaProvider, SqliteStore};

fn seed(dir: &TempDir) -> String {
    let path = dir.path().join("cars.db");
    let store = SqliteStore::open(&path).unwrap();
    store
        .execute_batch(
            "CREATE TABLE models (model_id INTEGER PRIMARY KEY, model_code TEXT, segment TEXT);
             CREATE TABLE dealerships (dealership_id INTEGER PRIMARY KEY, region TEXT);
             INSERT INTO models VALUES (1, 'X1', 'SUV'), (2, 'X3', 'SUV'), (3, 'C3', 'Sedan');
             INSERT INTO dealerships VALUES (1, 'North');",
        )
        .unwrap();
    format!("sqlite://{}", path.display())
}

#[tokio::test]
async fn test_connect_reads_schema_from_file() {
    let dir = TempDir::new().unwrap();
    let url = seed(&dir);

    let database = db::connect(&url).await.unwrap();
    let schema = database.get_schema().await.unwrap();

    assert_eq!(
        schema.table_names().collect::<Vec<_>>(),
        vec!["dealerships", "models"]
    );
    let columns: Vec<&str> = schema
        .columns("models")
        .unwrap()
        .iter()
        .map(|c| c.column_name.as_str())
        .collect();
    assert_eq!(columns, vec!["model_id", "model_code", "segment"]);
}

#[tokio::test]
async fn test_execute_returns_rows_in_column_order() {
    let dir = TempDir::new().unwrap();
    let url = seed(&dir);
    let database = db::connect(&url).await.unwrap();

    let result = database
        .execute(
            "SELECT segment, COUNT(DISTINCT model_code) AS model_count \
             FROM models GROUP BY segment ORDER BY segment",
        )
        .await
        .unwrap();

    assert_eq!(result.row_count, 2);
    assert_eq!(result.column_names, vec!["segment", "model_count"]);
    assert_eq!(result.rows[0]["segment"], json!("SUV"));
    assert_eq!(result.rows[0]["model_count"], json!(2));
    assert_eq!(result.rows[1]["model_count"], json!(1));
    assert!(result.duration_ms >= 0.0);
}

#[tokio::test]
async fn test_bad_query_is_database_error() {
    let dir = TempDir::new().unwrap();
    let url = seed(&dir);
    let database = db::connect(&url).await.unwrap();

    let err = database.execute("SELECT * FROM ghost_table").await.unwrap_err();
    assert!(err.to_string().starts_with("Database error"));
    assert!(!err.is_fatal());
}
