//! SQLite-backed stores
//!
//! One `SqliteStore` over a shared pool implements the report, template and
//! issue store traits. JSON columns are (de)serialized here and nowhere else.

pub mod issues;
pub mod reports;
pub mod templates;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::path::Path;
use uuid::Uuid;
use vmt_common::{Error, Result};

/// SQLite implementation of the store traits
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (or create) the database file and wrap it
    pub async fn open(db_path: &Path) -> Result<Self> {
        let pool = vmt_common::db::init_database(db_path).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn parse_uuid(raw: &str, column: &str) -> Result<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|e| Error::MalformedInput(format!("invalid UUID in column {}: {}", column, e)))
}

fn parse_optional_uuid(raw: Option<String>, column: &str) -> Result<Option<Uuid>> {
    raw.as_deref().map(|s| parse_uuid(s, column)).transpose()
}

fn parse_timestamp(raw: &str, column: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::MalformedInput(format!("invalid timestamp in column {}: {}", column, e)))
}

fn to_json_text<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::Internal(format!("JSON encoding failed: {}", e)))
}
