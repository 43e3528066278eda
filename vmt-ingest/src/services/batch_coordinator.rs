//! Batch coordinator
//!
//! Runs one template over the records of one report:
//!
//! 1. Take the unit's lock
//! 2. Load the unit pool (every issue of the unit) and the template pool
//!    (the unit's issues of this template) once
//! 3. Classify each record in input order; drop, merge or create
//! 4. Mirror every merge and create into both pools so later records in the
//!    batch see them
//! 5. Release the lock, then notify if anything was created or changed
//!
//! Store failures abort the batch. Whatever was written for earlier records
//! stays written.

use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;
use vmt_common::db::{NewIssue, Report, ReportStatistics, Template};
use vmt_common::{Error, Result};

use super::issue_matcher::{classify, MatchOutcome};
use super::issue_merger::merge_record;
use super::issue_pool::IssuePool;
use super::unit_locks::UnitLocks;
use crate::notifier::Notifier;
use crate::risk;
use crate::rules::IngestRules;
use crate::store::IssueStore;

/// Per-batch counters
///
/// `new` bills creations and state-changing merges together; the parts
/// stay visible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub total: usize,
    pub created: usize,
    /// Internal matches merged into, changed or not
    pub merged: usize,
    /// Merges that actually changed stored fields
    pub changed_merges: usize,
    /// Records dropped by external comparison
    pub dropped: usize,
}

impl BatchOutcome {
    /// Records that created an issue or changed one
    pub fn new_count(&self) -> usize {
        self.created + self.changed_merges
    }

    pub fn old_count(&self) -> usize {
        self.total - self.new_count()
    }

    pub fn statistics(&self) -> ReportStatistics {
        ReportStatistics {
            new: self.new_count(),
            old: self.old_count(),
            created: self.created,
            merged: self.merged,
        }
    }
}

pub struct BatchCoordinator {
    issues: Arc<dyn IssueStore>,
    notifier: Option<Arc<dyn Notifier>>,
    locks: UnitLocks,
}

impl BatchCoordinator {
    pub fn new(issues: Arc<dyn IssueStore>) -> Self {
        Self {
            issues,
            notifier: None,
            locks: UnitLocks::new(),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Share a lock registry with other coordinators over the same store
    pub fn with_unit_locks(mut self, locks: UnitLocks) -> Self {
        self.locks = locks;
        self
    }

    pub fn unit_locks(&self) -> &UnitLocks {
        &self.locks
    }

    /// Apply `template` to `records` extracted from `report`
    pub async fn apply(
        &self,
        records: &[Value],
        template: &Template,
        report: &Report,
    ) -> Result<BatchOutcome> {
        let rules = IngestRules::compile(template)?;

        let outcome = {
            let _unit_guard = self.locks.lock(report.unit_id).await;
            self.run(records, template, report, &rules).await?
        };

        tracing::info!(
            template = %template.name,
            report_id = %report.id,
            unit_id = %report.unit_id,
            total = outcome.total,
            created = outcome.created,
            merged = outcome.merged,
            changed_merges = outcome.changed_merges,
            dropped = outcome.dropped,
            "Batch applied"
        );

        if outcome.new_count() > 0 {
            self.notify(outcome.new_count(), template, report.unit_id).await;
        }

        Ok(outcome)
    }

    async fn run(
        &self,
        records: &[Value],
        template: &Template,
        report: &Report,
        rules: &IngestRules,
    ) -> Result<BatchOutcome> {
        let mut unit_pool = IssuePool::from_issues(self.issues.find_by_unit(report.unit_id).await?);
        let mut template_pool = IssuePool::from_issues(
            self.issues
                .find_by_unit_and_template(report.unit_id, template.id)
                .await?,
        );

        tracing::debug!(
            unit_id = %report.unit_id,
            unit_issues = unit_pool.len(),
            template_issues = template_pool.len(),
            records = records.len(),
            "Issue pools loaded"
        );

        let mut outcome = BatchOutcome {
            total: records.len(),
            ..Default::default()
        };

        for (index, record) in records.iter().enumerate() {
            match classify(record, rules, &unit_pool, &template_pool) {
                MatchOutcome::External { matched } => {
                    tracing::debug!(index, matched, "Record already tracked in unit, skipping");
                    outcome.dropped += 1;
                }
                MatchOutcome::Merge { target } => {
                    let changed = self
                        .merge(record, target, rules, report.id, &mut unit_pool, &mut template_pool)
                        .await?;
                    tracing::debug!(index, issue_id = %target, changed, "Record merged");
                    outcome.merged += 1;
                    if changed > 0 {
                        outcome.changed_merges += 1;
                    }
                }
                MatchOutcome::New => {
                    let issue = self
                        .issues
                        .create(NewIssue {
                            unit_id: report.unit_id,
                            project_id: report.project_id,
                            template_id: template.id,
                            report_id: report.id,
                            risk: risk::normalize(rules.risk_field.get(record)),
                            fields: record.clone(),
                        })
                        .await?;
                    tracing::debug!(index, issue_id = %issue.id, risk = %issue.risk, "Issue created");
                    unit_pool.push(issue.clone());
                    template_pool.push(issue);
                    outcome.created += 1;
                }
            }
        }

        Ok(outcome)
    }

    async fn merge(
        &self,
        record: &Value,
        target: Uuid,
        rules: &IngestRules,
        report_id: Uuid,
        unit_pool: &mut IssuePool,
        template_pool: &mut IssuePool,
    ) -> Result<usize> {
        let mut fields = match template_pool.get(target) {
            Some(pooled) => pooled.issue.fields.clone(),
            None => {
                return Err(Error::Internal(format!(
                    "merge target {} is not in the template pool",
                    target
                )))
            }
        };

        let changed = merge_record(&mut fields, record, &rules.merge);
        self.issues.update_fields(target, &fields, report_id).await?;

        unit_pool.update_fields(target, &fields, report_id);
        template_pool.update_fields(target, &fields, report_id);

        Ok(changed)
    }

    async fn notify(&self, new_count: usize, template: &Template, unit_id: Uuid) {
        let Some(notifier) = &self.notifier else {
            return;
        };

        if let Err(e) = notifier.notify(new_count, template, unit_id).await {
            tracing::warn!(
                template = %template.name,
                unit_id = %unit_id,
                error = %e,
                "Issue notification failed"
            );
        }
    }
}
