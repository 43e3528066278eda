//! Compiled template rules
//!
//! Templates store their paths as text. Before a batch runs, every path is
//! parsed once so that a bad path fails the whole batch up front instead of
//! silently mismatching record after record.

use vmt_common::db::{NewTemplate, Template};
use vmt_common::{Error, Result};

use crate::field_path::FieldPath;

/// Parsed paths of one template
#[derive(Debug, Clone, PartialEq)]
pub struct IngestRules {
    pub path_to_issues: FieldPath,
    pub risk_field: FieldPath,
    pub external_comparison: Vec<FieldPath>,
    pub internal_comparison: Vec<FieldPath>,
    pub merge: Vec<FieldPath>,
}

impl IngestRules {
    pub fn compile(template: &Template) -> Result<Self> {
        Self::from_parts(
            &template.path_to_issues,
            &template.risk_field,
            &template.external_comparison_fields,
            &template.internal_comparison_fields,
            &template.merge_fields,
        )
    }

    /// Validate a template before it is stored
    pub fn validate(template: &NewTemplate) -> Result<()> {
        Self::from_parts(
            &template.path_to_issues,
            &template.risk_field,
            &template.external_comparison_fields,
            &template.internal_comparison_fields,
            &template.merge_fields,
        )
        .map(|_| ())
    }

    fn from_parts(
        path_to_issues: &str,
        risk_field: &str,
        external: &[String],
        internal: &[String],
        merge: &[String],
    ) -> Result<Self> {
        Ok(Self {
            path_to_issues: parse_one("pathToIssues", path_to_issues)?,
            risk_field: parse_one("riskField", risk_field)?,
            external_comparison: parse_list("externalComparisonFields", external)?,
            internal_comparison: parse_list("internalComparisonFields", internal)?,
            merge: parse_list("mergeFields", merge)?,
        })
    }
}

fn parse_one(setting: &str, raw: &str) -> Result<FieldPath> {
    FieldPath::parse(raw)
        .map_err(|e| Error::InvalidInput(format!("{} '{}': {}", setting, raw, e)))
}

fn parse_list(setting: &str, raw: &[String]) -> Result<Vec<FieldPath>> {
    raw.iter()
        .map(|path| {
            if path.is_empty() {
                return Err(Error::InvalidInput(format!("{} contains an empty path", setting)));
            }
            parse_one(setting, path)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> NewTemplate {
        NewTemplate {
            name: "trivy".into(),
            display_name: "Trivy".into(),
            path_to_issues: "Results[0].Vulnerabilities".into(),
            risk_field: "Severity".into(),
            external_comparison_fields: vec!["VulnerabilityID".into()],
            internal_comparison_fields: vec!["VulnerabilityID".into(), "PkgName".into()],
            merge_fields: vec!["InstalledVersion".into()],
            body_fields: vec![],
        }
    }

    #[test]
    fn test_validate_accepts_well_formed_paths() {
        assert!(IngestRules::validate(&template()).is_ok());
    }

    #[test]
    fn test_empty_issue_path_is_root() {
        let mut tpl = template();
        tpl.path_to_issues = String::new();
        let rules = IngestRules::from_parts(&tpl.path_to_issues, "Severity", &[], &[], &[]).unwrap();
        assert!(rules.path_to_issues.is_root());
    }

    #[test]
    fn test_bad_path_names_the_setting() {
        let mut tpl = template();
        tpl.merge_fields = vec!["Fixed[".into()];
        let err = IngestRules::validate(&tpl).unwrap_err();
        match err {
            Error::InvalidInput(msg) => assert!(msg.starts_with("mergeFields 'Fixed['"), "{}", msg),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_comparison_entry_rejected() {
        let mut tpl = template();
        tpl.external_comparison_fields.push(String::new());
        assert!(matches!(IngestRules::validate(&tpl), Err(Error::InvalidInput(_))));
    }
}
