//! Template service
//!
//! Applying a template to a report, plus template management. Deleting a
//! template never deletes issues; it only detaches them.

use std::sync::Arc;
use uuid::Uuid;
use vmt_common::db::{NewTemplate, ReportStatistics, Template, TemplateEdit, TemplateSummary};
use vmt_common::events::{EventBus, VmtEvent};
use vmt_common::{Error, Result};

use super::batch_coordinator::BatchCoordinator;
use super::unit_locks::UnitLocks;
use crate::db::SqliteStore;
use crate::extractor::extract_records;
use crate::notifier::Notifier;
use crate::rules::IngestRules;
use crate::store::{IssueStore, ReportStore, TemplateStore};

pub struct TemplateService {
    templates: Arc<dyn TemplateStore>,
    reports: Arc<dyn ReportStore>,
    issues: Arc<dyn IssueStore>,
    coordinator: BatchCoordinator,
    event_bus: Option<EventBus>,
}

impl TemplateService {
    pub fn new(
        templates: Arc<dyn TemplateStore>,
        reports: Arc<dyn ReportStore>,
        issues: Arc<dyn IssueStore>,
    ) -> Self {
        let coordinator = BatchCoordinator::new(Arc::clone(&issues));
        Self {
            templates,
            reports,
            issues,
            coordinator,
            event_bus: None,
        }
    }

    /// Service with all three stores backed by one SQLite pool
    pub fn from_sqlite(store: SqliteStore) -> Self {
        let store = Arc::new(store);
        Self::new(store.clone(), store.clone(), store)
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.coordinator = self.coordinator.with_notifier(notifier);
        self
    }

    /// Publish `TemplateApplied` events after every successful apply
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn with_unit_locks(mut self, locks: UnitLocks) -> Self {
        self.coordinator = self.coordinator.with_unit_locks(locks);
        self
    }

    /// Apply a template to a stored report and record the statistics on it
    pub async fn apply(&self, report_id: Uuid, template_name: &str) -> Result<ReportStatistics> {
        let template = self.templates.find_by_name(template_name).await?;
        let report = self.reports.find_by_id(report_id).await?;

        let rules = IngestRules::compile(&template)?;
        let records = extract_records(&report, &rules.path_to_issues)?;

        tracing::info!(
            template = %template.name,
            report_id = %report.id,
            report_type = %report.report_type,
            records = records.len(),
            "Applying template"
        );

        let outcome = self.coordinator.apply(&records, &template, &report).await?;
        let statistics = outcome.statistics();

        self.reports
            .update_statistics(report.id, &statistics, template.id)
            .await?;

        if let Some(bus) = &self.event_bus {
            bus.emit_lossy(VmtEvent::TemplateApplied {
                report_id: report.id,
                template_name: template.name.clone(),
                statistics,
                timestamp: chrono::Utc::now(),
            });
        }

        Ok(statistics)
    }

    pub async fn create(&self, template: NewTemplate) -> Result<Template> {
        if template.name.trim().is_empty() {
            return Err(Error::InvalidInput("template name must not be empty".to_string()));
        }
        IngestRules::validate(&template)?;

        let created = self.templates.insert(template).await?;
        tracing::info!(template = %created.name, template_id = %created.id, "Template created");
        Ok(created)
    }

    pub async fn get(&self, name: &str) -> Result<Template> {
        self.templates.find_by_name(name).await
    }

    /// All templates by name; `verbose` adds issue and report counts
    pub async fn list(&self, verbose: bool) -> Result<Vec<TemplateSummary>> {
        let templates = self.templates.list().await?;
        let mut summaries = Vec::with_capacity(templates.len());

        for template in templates {
            let (num_issues, num_reports) = if verbose {
                (
                    Some(self.issues.count_by_template(template.id).await?),
                    Some(self.reports.count_by_template(template.id).await?),
                )
            } else {
                (None, None)
            };
            summaries.push(TemplateSummary {
                template,
                num_issues,
                num_reports,
            });
        }

        Ok(summaries)
    }

    /// Partial update. Changing comparison fields is allowed even when
    /// issues already exist; those issues keep the shape they were stored in.
    pub async fn update(&self, name: &str, edit: TemplateEdit) -> Result<Template> {
        let mut preview = self.templates.find_by_name(name).await?;
        edit.apply_to(&mut preview);
        IngestRules::compile(&preview)?;

        if edit.changes_identity() {
            let existing = self.issues.count_by_template(preview.id).await?;
            if existing > 0 {
                tracing::warn!(
                    template = %name,
                    existing_issues = existing,
                    "Comparison fields changed on a template with stored issues; \
                     earlier issues may stop matching"
                );
            }
        }

        let updated = self.templates.update(name, &edit).await?;
        tracing::info!(template = %updated.name, "Template updated");
        Ok(updated)
    }

    /// Detach issues and reports from the template, then delete it
    pub async fn delete(&self, name: &str) -> Result<()> {
        let template = self.templates.find_by_name(name).await?;

        let issues = self.issues.detach_template(template.id).await?;
        let reports = self.reports.detach_template(template.id).await?;
        self.templates.delete(name).await?;

        tracing::info!(
            template = %name,
            detached_issues = issues,
            detached_reports = reports,
            "Template deleted"
        );
        Ok(())
    }
}
