//! Template persistence

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;
use vmt_common::db::{BodyField, NewTemplate, Template, TemplateEdit};
use vmt_common::{Error, Result};

use super::{parse_timestamp, parse_uuid, to_json_text, SqliteStore};
use crate::store::TemplateStore;

const TEMPLATE_COLUMNS: &str = "guid, name, display_name, path_to_issues, risk_field, \
     external_comparison_fields, internal_comparison_fields, merge_fields, body_fields, created_at";

fn string_list(row: &SqliteRow, column: &str) -> Result<Vec<String>> {
    let text: String = row.try_get(column)?;
    serde_json::from_str(&text)
        .map_err(|e| Error::MalformedInput(format!("templates.{} is not a string list: {}", column, e)))
}

fn template_from_row(row: &SqliteRow) -> Result<Template> {
    let guid: String = row.try_get("guid")?;
    let body_fields: String = row.try_get("body_fields")?;
    let created_at: String = row.try_get("created_at")?;

    let body_fields: Vec<BodyField> = serde_json::from_str(&body_fields)
        .map_err(|e| Error::MalformedInput(format!("templates.body_fields: {}", e)))?;

    Ok(Template {
        id: parse_uuid(&guid, "templates.guid")?,
        name: row.try_get("name")?,
        display_name: row.try_get("display_name")?,
        path_to_issues: row.try_get("path_to_issues")?,
        risk_field: row.try_get("risk_field")?,
        external_comparison_fields: string_list(row, "external_comparison_fields")?,
        internal_comparison_fields: string_list(row, "internal_comparison_fields")?,
        merge_fields: string_list(row, "merge_fields")?,
        body_fields,
        created_at: parse_timestamp(&created_at, "templates.created_at")?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

#[async_trait]
impl TemplateStore for SqliteStore {
    async fn find_by_name(&self, name: &str) -> Result<Template> {
        let row = sqlx::query(&format!("SELECT {} FROM templates WHERE name = ?", TEMPLATE_COLUMNS))
            .bind(name)
            .fetch_optional(self.pool())
            .await?;

        match row {
            Some(row) => template_from_row(&row),
            None => Err(Error::NotFound(format!("template '{}'", name))),
        }
    }

    async fn insert(&self, template: NewTemplate) -> Result<Template> {
        let created = Template {
            id: Uuid::new_v4(),
            name: template.name,
            display_name: template.display_name,
            path_to_issues: template.path_to_issues,
            risk_field: template.risk_field,
            external_comparison_fields: template.external_comparison_fields,
            internal_comparison_fields: template.internal_comparison_fields,
            merge_fields: template.merge_fields,
            body_fields: template.body_fields,
            created_at: Utc::now(),
        };

        sqlx::query(&format!(
            "INSERT INTO templates ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            TEMPLATE_COLUMNS
        ))
        .bind(created.id.to_string())
        .bind(&created.name)
        .bind(&created.display_name)
        .bind(&created.path_to_issues)
        .bind(&created.risk_field)
        .bind(to_json_text(&created.external_comparison_fields)?)
        .bind(to_json_text(&created.internal_comparison_fields)?)
        .bind(to_json_text(&created.merge_fields)?)
        .bind(to_json_text(&created.body_fields)?)
        .bind(created.created_at.to_rfc3339())
        .execute(self.pool())
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::Conflict(format!("template '{}' already exists", created.name))
            } else {
                Error::storage("insert template", e)
            }
        })?;

        Ok(created)
    }

    async fn list(&self) -> Result<Vec<Template>> {
        let rows = sqlx::query(&format!("SELECT {} FROM templates ORDER BY name", TEMPLATE_COLUMNS))
            .fetch_all(self.pool())
            .await?;

        rows.iter().map(template_from_row).collect()
    }

    async fn update(&self, name: &str, edit: &TemplateEdit) -> Result<Template> {
        let mut template = self.find_by_name(name).await?;
        edit.apply_to(&mut template);

        sqlx::query(
            r#"
            UPDATE templates
            SET display_name = ?, path_to_issues = ?, risk_field = ?,
                external_comparison_fields = ?, internal_comparison_fields = ?,
                merge_fields = ?, body_fields = ?
            WHERE guid = ?
            "#,
        )
        .bind(&template.display_name)
        .bind(&template.path_to_issues)
        .bind(&template.risk_field)
        .bind(to_json_text(&template.external_comparison_fields)?)
        .bind(to_json_text(&template.internal_comparison_fields)?)
        .bind(to_json_text(&template.merge_fields)?)
        .bind(to_json_text(&template.body_fields)?)
        .bind(template.id.to_string())
        .execute(self.pool())
        .await
        .map_err(|e| Error::storage("update template", e))?;

        Ok(template)
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM templates WHERE name = ?")
            .bind(name)
            .execute(self.pool())
            .await
            .map_err(|e| Error::storage("delete template", e))?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("template '{}'", name)));
        }

        Ok(())
    }
}
