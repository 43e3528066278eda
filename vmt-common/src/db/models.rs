//! Database models
//!
//! Record blobs (`Issue::fields`) are kept as `serde_json::Value` in memory
//! and only become TEXT at the store boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::Error;

/// Issue severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Default for RiskLevel {
    fn default() -> Self {
        RiskLevel::Medium
    }
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Info => "info",
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parse of the stored column value (exact lowercase names only)
impl FromStr for RiskLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(RiskLevel::Info),
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            "critical" => Ok(RiskLevel::Critical),
            other => Err(Error::MalformedInput(format!("unknown risk level '{}'", other))),
        }
    }
}

/// How report content maps to records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReportType {
    /// Content is a single record
    Oneshot,
    /// Content holds an array of records (at the template's path)
    Batch,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Oneshot => "ONESHOT",
            ReportType::Batch => "BATCH",
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ONESHOT" => Ok(ReportType::Oneshot),
            "BATCH" => Ok(ReportType::Batch),
            other => Err(Error::MalformedInput(format!("unknown report type '{}'", other))),
        }
    }
}

/// Display-only field descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyField {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Rendering hint (`text`, `base64`, ...)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// Declarative description of how one report shape is parsed, matched and merged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: Uuid,
    pub name: String,
    pub display_name: String,
    pub path_to_issues: String,
    pub risk_field: String,
    pub external_comparison_fields: Vec<String>,
    pub internal_comparison_fields: Vec<String>,
    pub merge_fields: Vec<String>,
    pub body_fields: Vec<BodyField>,
    pub created_at: DateTime<Utc>,
}

/// Template creation request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTemplate {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub path_to_issues: String,
    #[serde(default)]
    pub risk_field: String,
    #[serde(default)]
    pub external_comparison_fields: Vec<String>,
    #[serde(default)]
    pub internal_comparison_fields: Vec<String>,
    #[serde(default)]
    pub merge_fields: Vec<String>,
    #[serde(default)]
    pub body_fields: Vec<BodyField>,
}

/// Partial template update; `None` leaves the stored value untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateEdit {
    pub display_name: Option<String>,
    pub path_to_issues: Option<String>,
    pub risk_field: Option<String>,
    pub external_comparison_fields: Option<Vec<String>>,
    pub internal_comparison_fields: Option<Vec<String>>,
    pub merge_fields: Option<Vec<String>>,
    pub body_fields: Option<Vec<BodyField>>,
}

impl TemplateEdit {
    /// Apply the edit to a template in place
    pub fn apply_to(&self, template: &mut Template) {
        if let Some(v) = &self.display_name {
            template.display_name = v.clone();
        }
        if let Some(v) = &self.path_to_issues {
            template.path_to_issues = v.clone();
        }
        if let Some(v) = &self.risk_field {
            template.risk_field = v.clone();
        }
        if let Some(v) = &self.external_comparison_fields {
            template.external_comparison_fields = v.clone();
        }
        if let Some(v) = &self.internal_comparison_fields {
            template.internal_comparison_fields = v.clone();
        }
        if let Some(v) = &self.merge_fields {
            template.merge_fields = v.clone();
        }
        if let Some(v) = &self.body_fields {
            template.body_fields = v.clone();
        }
    }

    /// True if the edit touches fields used to match stored issues
    pub fn changes_identity(&self) -> bool {
        self.external_comparison_fields.is_some() || self.internal_comparison_fields.is_some()
    }
}

/// Template listing entry, with usage counts when requested
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSummary {
    #[serde(flatten)]
    pub template: Template,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_issues: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_reports: Option<i64>,
}

/// Stored, deduplicated finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: Uuid,
    pub unit_id: Uuid,
    pub project_id: Uuid,
    /// Cleared when the template is deleted
    pub template_id: Option<Uuid>,
    /// Report that last touched this issue
    pub report_id: Option<Uuid>,
    pub risk: RiskLevel,
    /// Canonical record state, updated by merges
    pub fields: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Issue creation request
#[derive(Debug, Clone, PartialEq)]
pub struct NewIssue {
    pub unit_id: Uuid,
    pub project_id: Uuid,
    pub template_id: Uuid,
    pub report_id: Uuid,
    pub risk: RiskLevel,
    pub fields: Value,
}

/// Batch statistics persisted on a report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportStatistics {
    /// Records that created an issue or changed one
    pub new: usize,
    /// `total - new`
    pub old: usize,
    #[serde(default)]
    pub created: usize,
    #[serde(default)]
    pub merged: usize,
}

/// Uploaded scan report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub unit_id: Uuid,
    pub project_id: Uuid,
    pub report_type: ReportType,
    /// Raw serialized content
    pub content: String,
    pub template_id: Option<Uuid>,
    pub statistics: Option<ReportStatistics>,
    pub created_at: DateTime<Utc>,
}

/// Report creation request
#[derive(Debug, Clone, PartialEq)]
pub struct NewReport {
    pub unit_id: Uuid,
    pub project_id: Uuid,
    pub report_type: ReportType,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_serde_is_lowercase() {
        let json = serde_json::to_string(&RiskLevel::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
        let parsed: RiskLevel = serde_json::from_str("\"info\"").unwrap();
        assert_eq!(parsed, RiskLevel::Info);
    }

    #[test]
    fn test_risk_level_from_str_is_strict() {
        assert_eq!("high".parse::<RiskLevel>().unwrap(), RiskLevel::High);
        assert!("High".parse::<RiskLevel>().is_err());
        assert!("negligible".parse::<RiskLevel>().is_err());
    }

    #[test]
    fn test_report_type_round_trips_column_value() {
        for t in [ReportType::Oneshot, ReportType::Batch] {
            assert_eq!(t.as_str().parse::<ReportType>().unwrap(), t);
        }
        assert!("oneshot".parse::<ReportType>().is_err());
    }

    #[test]
    fn test_new_template_deserializes_camel_case_with_defaults() {
        let tpl: NewTemplate = serde_json::from_str(
            r#"{
                "name": "zap",
                "displayName": "OWASP ZAP",
                "pathToIssues": "site[0].alerts",
                "riskField": "riskdesc",
                "internalComparisonFields": ["pluginid"],
                "bodyFields": [{"key": "desc", "type": "base64"}]
            }"#,
        )
        .unwrap();

        assert_eq!(tpl.name, "zap");
        assert_eq!(tpl.path_to_issues, "site[0].alerts");
        assert!(tpl.external_comparison_fields.is_empty());
        assert!(tpl.merge_fields.is_empty());
        assert_eq!(tpl.body_fields[0].kind.as_deref(), Some("base64"));
    }

    #[test]
    fn test_template_edit_applies_only_present_fields() {
        let mut template = Template {
            id: Uuid::new_v4(),
            name: "zap".into(),
            display_name: "ZAP".into(),
            path_to_issues: "alerts".into(),
            risk_field: "risk".into(),
            external_comparison_fields: vec!["name".into()],
            internal_comparison_fields: vec!["id".into()],
            merge_fields: vec![],
            body_fields: vec![],
            created_at: Utc::now(),
        };

        let edit = TemplateEdit {
            display_name: Some("OWASP ZAP".into()),
            merge_fields: Some(vec!["instances".into()]),
            ..Default::default()
        };
        assert!(!edit.changes_identity());
        edit.apply_to(&mut template);

        assert_eq!(template.display_name, "OWASP ZAP");
        assert_eq!(template.merge_fields, vec!["instances".to_string()]);
        assert_eq!(template.internal_comparison_fields, vec!["id".to_string()]);
    }

    #[test]
    fn test_report_statistics_reads_legacy_shape() {
        let stats: ReportStatistics = serde_json::from_str(r#"{"new": 3, "old": 1}"#).unwrap();
        assert_eq!(stats, ReportStatistics { new: 3, old: 1, created: 0, merged: 0 });
    }
}
