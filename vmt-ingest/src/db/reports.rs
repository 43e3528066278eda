//! Report persistence

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;
use vmt_common::db::{NewReport, Report, ReportStatistics, ReportType};
use vmt_common::{Error, Result};

use super::{parse_optional_uuid, parse_timestamp, parse_uuid, to_json_text, SqliteStore};
use crate::store::ReportStore;

fn report_from_row(row: &SqliteRow) -> Result<Report> {
    let guid: String = row.try_get("guid")?;
    let unit_id: String = row.try_get("unit_id")?;
    let project_id: String = row.try_get("project_id")?;
    let report_type: String = row.try_get("report_type")?;
    let statistics: Option<String> = row.try_get("statistics")?;
    let created_at: String = row.try_get("created_at")?;

    let statistics = statistics
        .map(|text| serde_json::from_str::<ReportStatistics>(&text))
        .transpose()
        .map_err(|e| {
            Error::MalformedInput(format!("report {} has unreadable statistics: {}", guid, e))
        })?;

    Ok(Report {
        id: parse_uuid(&guid, "reports.guid")?,
        unit_id: parse_uuid(&unit_id, "reports.unit_id")?,
        project_id: parse_uuid(&project_id, "reports.project_id")?,
        report_type: report_type.parse::<ReportType>()?,
        content: row.try_get("content")?,
        template_id: parse_optional_uuid(row.try_get("template_id")?, "reports.template_id")?,
        statistics,
        created_at: parse_timestamp(&created_at, "reports.created_at")?,
    })
}

#[async_trait]
impl ReportStore for SqliteStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Report> {
        let row = sqlx::query(
            r#"
            SELECT guid, unit_id, project_id, report_type, content, template_id, statistics, created_at
            FROM reports
            WHERE guid = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(self.pool())
        .await?;

        match row {
            Some(row) => report_from_row(&row),
            None => Err(Error::NotFound(format!("report {}", id))),
        }
    }

    async fn update_statistics(
        &self,
        id: Uuid,
        statistics: &ReportStatistics,
        template_id: Uuid,
    ) -> Result<()> {
        let result = sqlx::query("UPDATE reports SET statistics = ?, template_id = ? WHERE guid = ?")
            .bind(to_json_text(statistics)?)
            .bind(template_id.to_string())
            .bind(id.to_string())
            .execute(self.pool())
            .await
            .map_err(|e| Error::storage("update report statistics", e))?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("report {}", id)));
        }

        Ok(())
    }

    async fn insert(&self, report: NewReport) -> Result<Report> {
        let created = Report {
            id: Uuid::new_v4(),
            unit_id: report.unit_id,
            project_id: report.project_id,
            report_type: report.report_type,
            content: report.content,
            template_id: None,
            statistics: None,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO reports (guid, unit_id, project_id, report_type, content, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(created.id.to_string())
        .bind(created.unit_id.to_string())
        .bind(created.project_id.to_string())
        .bind(created.report_type.as_str())
        .bind(&created.content)
        .bind(created.created_at.to_rfc3339())
        .execute(self.pool())
        .await
        .map_err(|e| Error::storage("insert report", e))?;

        Ok(created)
    }

    async fn detach_template(&self, template_id: Uuid) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE reports SET template_id = NULL, statistics = NULL WHERE template_id = ?",
        )
        .bind(template_id.to_string())
        .execute(self.pool())
        .await
        .map_err(|e| Error::storage("detach reports from template", e))?;

        Ok(result.rows_affected())
    }

    async fn count_by_template(&self, template_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reports WHERE template_id = ?")
            .bind(template_id.to_string())
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }
}
