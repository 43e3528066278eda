//! Match engine
//!
//! Decides what happens to one incoming record:
//!
//! 1. External comparison against every issue of the unit. Each external
//!    path narrows the pool to issues whose lowercased serialized fields
//!    contain the lowercased value the path yields on the record. Anything
//!    left over means some template already tracks this finding and the
//!    record is dropped.
//! 2. Internal comparison against the unit's issues of the same template.
//!    Each internal path narrows the pool to issues whose value at that
//!    path equals the record's. The first survivor is the merge target,
//!    unless the template declares no merge fields, in which case the
//!    record becomes a new issue. With no internal paths every issue of the
//!    template survives.
//!
//! An empty external list never matches anything.

use serde_json::Value;
use uuid::Uuid;

use super::issue_pool::{IssuePool, PooledIssue};
use crate::field_path::FieldPath;
use crate::rules::IngestRules;

/// Outcome for one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Already represented in the unit; skip
    External { matched: usize },
    /// Merge into this existing issue of the same template
    Merge { target: Uuid },
    /// Create a new issue
    New,
}

/// Issues of `pool` that survive every external filter
pub fn external_matches<'a>(
    pool: &'a IssuePool,
    record: &Value,
    paths: &[FieldPath],
) -> Vec<&'a PooledIssue> {
    if paths.is_empty() {
        return Vec::new();
    }

    let mut remaining: Vec<&PooledIssue> = pool.iter().collect();
    for path in paths {
        let needle = match path.get(record).and_then(needle_text) {
            Some(needle) => needle,
            None => return Vec::new(),
        };
        remaining.retain(|pooled| pooled.haystack().contains(&needle));
        if remaining.is_empty() {
            break;
        }
    }
    remaining
}

/// Issues of `pool` whose value at every internal path equals the record's
///
/// A path missing on both sides counts as equal. No paths keep the whole pool.
pub fn internal_matches<'a>(
    pool: &'a IssuePool,
    record: &Value,
    paths: &[FieldPath],
) -> Vec<&'a PooledIssue> {
    let mut remaining: Vec<&PooledIssue> = pool.iter().collect();
    for path in paths {
        let wanted = path.get(record);
        remaining.retain(|pooled| path.get(&pooled.issue.fields) == wanted);
        if remaining.is_empty() {
            break;
        }
    }
    remaining
}

/// Classify one record against the unit pool and the template pool
pub fn classify(
    record: &Value,
    rules: &IngestRules,
    unit_pool: &IssuePool,
    template_pool: &IssuePool,
) -> MatchOutcome {
    let external = external_matches(unit_pool, record, &rules.external_comparison);
    if !external.is_empty() {
        return MatchOutcome::External {
            matched: external.len(),
        };
    }

    if rules.merge.is_empty() {
        return MatchOutcome::New;
    }

    match internal_matches(template_pool, record, &rules.internal_comparison).first() {
        Some(target) => MatchOutcome::Merge {
            target: target.issue.id,
        },
        None => MatchOutcome::New,
    }
}

/// Lowercased text an external path searches for.
///
/// Strings are used as-is; other values by their JSON text. Null has
/// nothing to search for.
fn needle_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.to_lowercase()),
        other => Some(other.to_string().to_lowercase()),
    }
}
