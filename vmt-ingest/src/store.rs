//! Store contracts consumed by the ingest engine
//!
//! The engine never talks to SQLite directly; it goes through these traits.
//! `crate::db::SqliteStore` implements all three. Reads that find nothing
//! return `Error::NotFound`; failed writes return `Error::StorageFailure`.

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;
use vmt_common::db::{
    Issue, NewIssue, NewReport, NewTemplate, Report, ReportStatistics, Template, TemplateEdit,
};
use vmt_common::Result;

/// Persistent report storage
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Report>;

    /// Overwrite the statistics and template reference of a report
    async fn update_statistics(
        &self,
        id: Uuid,
        statistics: &ReportStatistics,
        template_id: Uuid,
    ) -> Result<()>;

    async fn insert(&self, report: NewReport) -> Result<Report>;

    /// Clear template reference and statistics on every report of a template.
    /// Returns the number of reports touched.
    async fn detach_template(&self, template_id: Uuid) -> Result<u64>;

    async fn count_by_template(&self, template_id: Uuid) -> Result<i64>;
}

/// Template definitions
#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn find_by_name(&self, name: &str) -> Result<Template>;

    /// Fails with `Error::Conflict` when the name is taken
    async fn insert(&self, template: NewTemplate) -> Result<Template>;

    /// All templates ordered by name
    async fn list(&self) -> Result<Vec<Template>>;

    async fn update(&self, name: &str, edit: &TemplateEdit) -> Result<Template>;

    async fn delete(&self, name: &str) -> Result<()>;
}

/// Canonical issue storage
///
/// Pool loads return issues in insertion order; the match engine's
/// "first remaining candidate" tie-break depends on it.
#[async_trait]
pub trait IssueStore: Send + Sync {
    async fn find_by_unit(&self, unit_id: Uuid) -> Result<Vec<Issue>>;

    async fn find_by_unit_and_template(&self, unit_id: Uuid, template_id: Uuid) -> Result<Vec<Issue>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Issue>;

    async fn create(&self, issue: NewIssue) -> Result<Issue>;

    /// Replace an issue's fields and record the report that touched it last
    async fn update_fields(&self, issue_id: Uuid, fields: &Value, report_id: Uuid) -> Result<()>;

    /// Clear the template reference of every issue of a template.
    /// Returns the number of issues touched.
    async fn detach_template(&self, template_id: Uuid) -> Result<u64>;

    async fn count_by_template(&self, template_id: Uuid) -> Result<i64>;
}
