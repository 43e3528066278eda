//! Record extraction from report content
//!
//! Turns a stored report into the list of raw records a template applies
//! to. Content is JSON; `ONESHOT` reports are one record, every other
//! report holds an array of records at the template's issue path.

use serde_json::Value;
use vmt_common::db::{Report, ReportType};
use vmt_common::{Error, Result};

use crate::field_path::FieldPath;

/// Extract raw records from a report
pub fn extract_records(report: &Report, path_to_issues: &FieldPath) -> Result<Vec<Value>> {
    let content: Value = serde_json::from_str(&report.content)?;

    if report.report_type == ReportType::Oneshot {
        return Ok(vec![content]);
    }

    let located = if path_to_issues.is_root() {
        content
    } else {
        match path_to_issues.get(&content) {
            Some(value) => value.clone(),
            None => {
                return Err(Error::MalformedInput(format!(
                    "report {} has nothing at path '{}'",
                    report.id, path_to_issues
                )))
            }
        }
    };

    match located {
        Value::Array(records) => Ok(records),
        other => Err(Error::MalformedInput(format!(
            "report {}: expected an array of records at path '{}', found {}",
            report.id,
            path_to_issues,
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn report(report_type: ReportType, content: &str) -> Report {
        Report {
            id: Uuid::new_v4(),
            unit_id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            report_type,
            content: content.to_string(),
            template_id: None,
            statistics: None,
            created_at: Utc::now(),
        }
    }

    fn path(raw: &str) -> FieldPath {
        FieldPath::parse(raw).unwrap()
    }

    #[test]
    fn test_oneshot_yields_whole_content() {
        let rep = report(ReportType::Oneshot, r#"{"title": "Open redirect", "items": [1, 2]}"#);
        let records = extract_records(&rep, &path("items")).unwrap();
        assert_eq!(records, vec![json!({"title": "Open redirect", "items": [1, 2]})]);
    }

    #[test]
    fn test_batch_with_root_path() {
        let rep = report(ReportType::Batch, r#"[{"id": 1}, {"id": 2}]"#);
        let records = extract_records(&rep, &FieldPath::root()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1], json!({"id": 2}));
    }

    #[test]
    fn test_batch_with_nested_path() {
        let rep = report(
            ReportType::Batch,
            r#"{"site": [{"alerts": [{"pluginid": "1"}, {"pluginid": "2"}, {"pluginid": "3"}]}]}"#,
        );
        let records = extract_records(&rep, &path("site[0].alerts")).unwrap();
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let rep = report(ReportType::Batch, "[{");
        assert!(matches!(
            extract_records(&rep, &FieldPath::root()),
            Err(Error::MalformedInput(_))
        ));
    }

    #[test]
    fn test_missing_path_is_malformed() {
        let rep = report(ReportType::Batch, r#"{"results": []}"#);
        assert!(matches!(
            extract_records(&rep, &path("vulnerabilities")),
            Err(Error::MalformedInput(_))
        ));
    }

    #[test]
    fn test_non_array_target_is_malformed() {
        let rep = report(ReportType::Batch, r#"{"results": {"id": 1}}"#);
        let err = extract_records(&rep, &path("results")).unwrap_err();
        assert!(err.to_string().contains("found an object"), "{}", err);
    }
}
