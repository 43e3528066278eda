//! Database initialization
//!
//! Creates the SQLite file on first run and the `templates`, `reports`
//! and `issues` tables. Every step is idempotent, so opening an existing
//! database runs the same path.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL lets readers proceed while a batch is writing
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    init_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables on an already-open pool (also used by in-memory test pools)
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(pool)
        .await?;

    create_templates_table(pool).await?;
    create_reports_table(pool).await?;
    create_issues_table(pool).await?;

    Ok(())
}

/// Create the templates table
///
/// Field lists are JSON arrays stored as TEXT.
pub async fn create_templates_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS templates (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            display_name TEXT NOT NULL DEFAULT '',
            path_to_issues TEXT NOT NULL DEFAULT '',
            risk_field TEXT NOT NULL DEFAULT '',
            external_comparison_fields TEXT NOT NULL DEFAULT '[]',
            internal_comparison_fields TEXT NOT NULL DEFAULT '[]',
            merge_fields TEXT NOT NULL DEFAULT '[]',
            body_fields TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the reports table
///
/// `template_id` and `statistics` are rewritten every time a template is applied.
pub async fn create_reports_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reports (
            guid TEXT PRIMARY KEY,
            unit_id TEXT NOT NULL,
            project_id TEXT NOT NULL,
            report_type TEXT NOT NULL CHECK (report_type IN ('ONESHOT', 'BATCH')),
            content TEXT NOT NULL,
            template_id TEXT REFERENCES templates(guid) ON DELETE SET NULL,
            statistics TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the issues table
pub async fn create_issues_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS issues (
            guid TEXT PRIMARY KEY,
            unit_id TEXT NOT NULL,
            project_id TEXT NOT NULL,
            template_id TEXT REFERENCES templates(guid) ON DELETE SET NULL,
            report_id TEXT REFERENCES reports(guid) ON DELETE SET NULL,
            risk TEXT NOT NULL CHECK (risk IN ('info', 'low', 'medium', 'high', 'critical')),
            fields TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Pool loads are by unit, and by unit + template
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_issues_unit ON issues(unit_id, created_at)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_issues_unit_template ON issues(unit_id, template_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
