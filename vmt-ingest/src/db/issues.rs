//! Issue persistence

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;
use vmt_common::db::{Issue, NewIssue, RiskLevel};
use vmt_common::{Error, Result};

use super::{parse_optional_uuid, parse_timestamp, parse_uuid, to_json_text, SqliteStore};
use crate::store::IssueStore;

const ISSUE_COLUMNS: &str =
    "guid, unit_id, project_id, template_id, report_id, risk, fields, created_at, updated_at";

fn issue_from_row(row: &SqliteRow) -> Result<Issue> {
    let guid: String = row.try_get("guid")?;
    let unit_id: String = row.try_get("unit_id")?;
    let project_id: String = row.try_get("project_id")?;
    let risk: String = row.try_get("risk")?;
    let fields: String = row.try_get("fields")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    let fields: Value = serde_json::from_str(&fields).map_err(|e| {
        Error::MalformedInput(format!("issue {} has unreadable fields: {}", guid, e))
    })?;

    Ok(Issue {
        id: parse_uuid(&guid, "issues.guid")?,
        unit_id: parse_uuid(&unit_id, "issues.unit_id")?,
        project_id: parse_uuid(&project_id, "issues.project_id")?,
        template_id: parse_optional_uuid(row.try_get("template_id")?, "issues.template_id")?,
        report_id: parse_optional_uuid(row.try_get("report_id")?, "issues.report_id")?,
        risk: risk.parse::<RiskLevel>()?,
        fields,
        created_at: parse_timestamp(&created_at, "issues.created_at")?,
        updated_at: parse_timestamp(&updated_at, "issues.updated_at")?,
    })
}

#[async_trait]
impl IssueStore for SqliteStore {
    async fn find_by_unit(&self, unit_id: Uuid) -> Result<Vec<Issue>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM issues WHERE unit_id = ? ORDER BY rowid",
            ISSUE_COLUMNS
        ))
        .bind(unit_id.to_string())
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(issue_from_row).collect()
    }

    async fn find_by_unit_and_template(&self, unit_id: Uuid, template_id: Uuid) -> Result<Vec<Issue>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM issues WHERE unit_id = ? AND template_id = ? ORDER BY rowid",
            ISSUE_COLUMNS
        ))
        .bind(unit_id.to_string())
        .bind(template_id.to_string())
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(issue_from_row).collect()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Issue> {
        let row = sqlx::query(&format!("SELECT {} FROM issues WHERE guid = ?", ISSUE_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(self.pool())
            .await?;

        match row {
            Some(row) => issue_from_row(&row),
            None => Err(Error::NotFound(format!("issue {}", id))),
        }
    }

    async fn create(&self, issue: NewIssue) -> Result<Issue> {
        let now = Utc::now();
        let created = Issue {
            id: Uuid::new_v4(),
            unit_id: issue.unit_id,
            project_id: issue.project_id,
            template_id: Some(issue.template_id),
            report_id: Some(issue.report_id),
            risk: issue.risk,
            fields: issue.fields,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO issues (guid, unit_id, project_id, template_id, report_id, risk, fields, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(created.id.to_string())
        .bind(created.unit_id.to_string())
        .bind(created.project_id.to_string())
        .bind(issue.template_id.to_string())
        .bind(issue.report_id.to_string())
        .bind(created.risk.as_str())
        .bind(to_json_text(&created.fields)?)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(self.pool())
        .await
        .map_err(|e| Error::storage("create issue", e))?;

        tracing::debug!(issue_id = %created.id, unit_id = %created.unit_id, "Issue created");

        Ok(created)
    }

    async fn update_fields(&self, issue_id: Uuid, fields: &Value, report_id: Uuid) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE issues
            SET fields = ?, report_id = ?, updated_at = ?
            WHERE guid = ?
            "#,
        )
        .bind(to_json_text(fields)?)
        .bind(report_id.to_string())
        .bind(Utc::now().to_rfc3339())
        .bind(issue_id.to_string())
        .execute(self.pool())
        .await
        .map_err(|e| Error::storage("update issue fields", e))?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("issue {}", issue_id)));
        }

        Ok(())
    }

    async fn detach_template(&self, template_id: Uuid) -> Result<u64> {
        let result = sqlx::query("UPDATE issues SET template_id = NULL WHERE template_id = ?")
            .bind(template_id.to_string())
            .execute(self.pool())
            .await
            .map_err(|e| Error::storage("detach issues from template", e))?;

        Ok(result.rows_affected())
    }

    async fn count_by_template(&self, template_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM issues WHERE template_id = ?")
            .bind(template_id.to_string())
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }
}
