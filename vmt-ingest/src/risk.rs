//! Risk normalization
//!
//! Scanners label severity in free text ("High", "Informative",
//! "Negligible", ...). Normalization is total: anything unrecognized,
//! including a missing or non-text value, becomes `medium`.

use serde_json::Value;
use vmt_common::db::RiskLevel;

/// Normalize a free-text risk label
pub fn normalize_label(raw: &str) -> RiskLevel {
    match raw.to_lowercase().as_str() {
        "negligible" | "informative" | "info" => RiskLevel::Info,
        "low" => RiskLevel::Low,
        "medium" => RiskLevel::Medium,
        "high" => RiskLevel::High,
        "critical" => RiskLevel::Critical,
        _ => RiskLevel::Medium,
    }
}

/// Normalize the value found at a template's risk field
pub fn normalize(raw: Option<&Value>) -> RiskLevel {
    match raw {
        Some(Value::String(label)) => normalize_label(label),
        _ => RiskLevel::Medium,
    }
}
