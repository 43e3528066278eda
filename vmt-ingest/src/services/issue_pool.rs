//! In-memory issue snapshots for one batch
//!
//! A batch loads the unit's issues once and then keeps this snapshot in step
//! with every create and merge it performs, so later records see the effect
//! of earlier ones without another store read.

use serde_json::Value;
use uuid::Uuid;
use vmt_common::db::Issue;

/// Issue plus the lowercased serialized form of its fields
///
/// The haystack is what external comparison searches; it is rebuilt
/// whenever the fields change.
#[derive(Debug, Clone)]
pub struct PooledIssue {
    pub issue: Issue,
    haystack: String,
}

impl PooledIssue {
    pub fn new(issue: Issue) -> Self {
        let haystack = haystack_of(&issue.fields);
        Self { issue, haystack }
    }

    pub fn haystack(&self) -> &str {
        &self.haystack
    }

    fn set_fields(&mut self, fields: Value) {
        self.haystack = haystack_of(&fields);
        self.issue.fields = fields;
    }
}

fn haystack_of(fields: &Value) -> String {
    // Value's Display is compact JSON and cannot fail
    fields.to_string().to_lowercase()
}

/// Ordered issue snapshot; order is load order followed by creation order
#[derive(Debug, Clone, Default)]
pub struct IssuePool {
    issues: Vec<PooledIssue>,
}

impl IssuePool {
    pub fn from_issues(issues: Vec<Issue>) -> Self {
        Self {
            issues: issues.into_iter().map(PooledIssue::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PooledIssue> {
        self.issues.iter()
    }

    pub fn get(&self, id: Uuid) -> Option<&PooledIssue> {
        self.issues.iter().find(|p| p.issue.id == id)
    }

    /// Append a freshly created issue
    pub fn push(&mut self, issue: Issue) {
        self.issues.push(PooledIssue::new(issue));
    }

    /// Mirror a merge that was written to the store.
    ///
    /// Returns false if the issue is not part of this pool.
    pub fn update_fields(&mut self, id: Uuid, fields: &Value, report_id: Uuid) -> bool {
        match self.issues.iter_mut().find(|p| p.issue.id == id) {
            Some(pooled) => {
                pooled.set_fields(fields.clone());
                pooled.issue.report_id = Some(report_id);
                true
            }
            None => false,
        }
    }
}
