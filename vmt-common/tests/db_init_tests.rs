//! Unit tests for database initialization

use sqlx::sqlite::SqlitePoolOptions;
use tempfile::TempDir;
use vmt_common::db::init::{init_database, init_schema};

async fn table_names(pool: &sqlx::SqlitePool) -> Vec<String> {
    sqlx::query_scalar::<_, String>(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(pool)
    .await
    .unwrap()
}

#[tokio::test]
async fn test_database_creation_when_missing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("sub").join("vmt.db");

    let pool = init_database(&db_path).await;
    assert!(pool.is_ok(), "Database initialization failed: {:?}", pool.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("vmt.db");

    let pool1 = init_database(&db_path).await.unwrap();
    pool1.close().await;

    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.err());
}

#[tokio::test]
async fn test_schema_creates_core_tables() {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    init_schema(&pool).await.unwrap();
    // Idempotent
    init_schema(&pool).await.unwrap();

    assert_eq!(table_names(&pool).await, vec!["issues", "reports", "templates"]);
}

#[tokio::test]
async fn test_issue_risk_column_rejects_unknown_level() {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    init_schema(&pool).await.unwrap();

    let result = sqlx::query(
        "INSERT INTO issues (guid, unit_id, project_id, risk, fields, created_at, updated_at)
         VALUES ('a', 'u', 'p', 'severe', '{}', '', '')",
    )
    .execute(&pool)
    .await;

    assert!(result.is_err());
}
