//! Test Helper Utilities
//!
//! Shared fixtures for vmt-ingest integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Mutex;
use uuid::Uuid;
use vmt_common::db::{init_schema, NewReport, NewTemplate, Report, ReportType, Template};
use vmt_common::{Error, Result};
use vmt_ingest::{Notifier, ReportStore, SqliteStore, TemplateStore};

/// Fresh in-memory database with the schema applied
///
/// One connection only: every connection to `sqlite::memory:` is its own
/// database.
pub async fn create_test_store() -> SqliteStore {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    init_schema(&pool).await.unwrap();
    SqliteStore::new(pool)
}

/// Template definition reading records from the report root
pub fn template_def(name: &str, external: &[&str], internal: &[&str], merge: &[&str]) -> NewTemplate {
    NewTemplate {
        name: name.to_string(),
        display_name: name.to_uppercase(),
        path_to_issues: String::new(),
        risk_field: "risk".to_string(),
        external_comparison_fields: external.iter().map(|s| s.to_string()).collect(),
        internal_comparison_fields: internal.iter().map(|s| s.to_string()).collect(),
        merge_fields: merge.iter().map(|s| s.to_string()).collect(),
        body_fields: vec![],
    }
}

pub async fn seed_template(
    store: &SqliteStore,
    name: &str,
    external: &[&str],
    internal: &[&str],
    merge: &[&str],
) -> Template {
    TemplateStore::insert(store, template_def(name, external, internal, merge))
        .await
        .unwrap()
}

/// Batch report whose content is `records` serialized
pub async fn seed_report(store: &SqliteStore, unit_id: Uuid, records: &Value) -> Report {
    ReportStore::insert(
        store,
        NewReport {
            unit_id,
            project_id: Uuid::new_v4(),
            report_type: ReportType::Batch,
            content: records.to_string(),
        },
    )
    .await
    .unwrap()
}

/// Notifier that remembers every call
#[derive(Default)]
pub struct RecordingNotifier {
    pub calls: Mutex<Vec<(usize, String, Uuid)>>,
}

impl RecordingNotifier {
    pub fn calls(&self) -> Vec<(usize, String, Uuid)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, new_count: usize, template: &Template, unit_id: Uuid) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((new_count, template.name.clone(), unit_id));
        Ok(())
    }
}

/// Notifier that always fails
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, _new_count: usize, _template: &Template, _unit_id: Uuid) -> Result<()> {
        Err(Error::Internal("chat webhook unreachable".to_string()))
    }
}
